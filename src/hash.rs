//! Content hashing.
//!
//! Every [`crate::op::Op`] carries a `parent` and a `hash`, each the SHA-1
//! digest of a document snapshot (the concatenation of all inserted text
//! up to that point). `ZERO_HASH` stands for the empty document.

use sha1::{Digest, Sha1};

/// A 20-byte SHA-1 digest.
pub type Hash = [u8; 20];

/// The hash of the empty document, and the required `parent` of the very
/// first operation ever appended to a document.
pub const ZERO_HASH: Hash = [0u8; 20];

/// Computes the content hash of a document snapshot.
pub trait Hasher {
    fn hash(&self, snapshot: &str) -> Hash;
}

/// The production hasher: SHA-1 over the UTF-8 bytes of the snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha1Hasher;

impl Hasher for Sha1Hasher {
    fn hash(&self, snapshot: &str) -> Hash {
        let mut hasher = Sha1::new();
        hasher.update(snapshot.as_bytes());
        hasher.finalize().into()
    }
}

/// Convenience wrapper around [`Sha1Hasher`] for call sites that don't need
/// to swap hashers (tests may substitute their own `Hasher` impl to avoid
/// depending on exact digest values).
pub fn hash_snapshot(snapshot: &str) -> Hash {
    Sha1Hasher.hash(snapshot)
}
