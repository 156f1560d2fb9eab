//! Operational transformation core for real-time collaborative plain-text
//! editing.
//!
//! The crate is the algebraic core of the collaboration protocol:
//! [`Op`]/[`Component`] as the edit record, [`compose`]/[`xform`] as the
//! pure algebraic operators, [`Doc`] as the append-only history, and
//! [`Client`]/[`Server`] as the session state machines that coordinate
//! local application, buffering, and remote integration. JSON encoding and
//! SHA-1 content hashing live behind the [`Codec`]/[`Hasher`] traits so
//! alternate wire formats or hash functions can be swapped in.

pub mod client;
pub mod codec;
pub mod compose;
pub mod doc;
pub mod error;
pub mod event;
pub mod hash;
pub mod op;
pub mod server;
pub mod xform;

pub use client::Client;
pub use codec::{Codec, JsonCodec};
pub use compose::compose;
pub use doc::Doc;
pub use error::{OtError, OtResult};
pub use event::{Event, EventType};
pub use hash::{hash_snapshot, Hash, Hasher, Sha1Hasher, ZERO_HASH};
pub use op::{Component, FmtPair, FormattingBoundary, Op, OpIter};
pub use server::Server;
pub use xform::xform;
