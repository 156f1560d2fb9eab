//! The append-only document history and its cached composed state.

use tracing::{debug, warn};

use crate::compose::compose;
use crate::error::{OtError, OtResult};
use crate::hash::{hash_snapshot, Hash, ZERO_HASH};
use crate::op::Op;

/// An append-only history of operations plus the folded `composed` state,
/// with an optional maximum document size.
///
/// `composed` is kept independently owned from the first append onward
/// (never aliasing `history[0]`), which sidesteps any aliasing special
/// case a history array that reallocates out from under a borrowed
/// pointer would otherwise need.
#[derive(Debug, Default, Clone)]
pub struct Doc {
    history: Vec<Op>,
    composed: Option<Op>,
    size: i64,
    max_size: u32,
}

impl Doc {
    /// A new, empty document with no size limit.
    pub fn new() -> Self {
        Doc {
            history: Vec::new(),
            composed: None,
            size: 0,
            max_size: 0,
        }
    }

    /// A new, empty document capped at `max_size` code points (0 means
    /// unlimited).
    pub fn with_max_size(max_size: u32) -> Self {
        let mut doc = Doc::new();
        doc.max_size = max_size;
        doc
    }

    pub fn history(&self) -> &[Op] {
        &self.history
    }

    pub fn composed(&self) -> Option<&Op> {
        self.composed.as_ref()
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// The hash of the current head, or the zero hash for an empty
    /// document.
    pub fn head_hash(&self) -> Hash {
        self.composed.as_ref().map(|op| op.hash).unwrap_or(ZERO_HASH)
    }

    /// Appends `op` to the history.
    ///
    /// Sets `op.parent` to the previous head's hash (or zero for the first
    /// op) regardless of what the caller supplied, composes it onto the
    /// running `composed` state, and recomputes both ops' `hash` from the
    /// result. Fails without mutating the document if the new size would
    /// exceed `max_size`, or if composing onto the existing history fails.
    pub fn append(&mut self, mut op: Op) -> OtResult<&Op> {
        let incoming_size = op.size();
        if self.max_size > 0 && self.size + incoming_size > self.max_size as i64 {
            warn!(max_size = self.max_size, "append exceeds document max_size");
            return Err(OtError::MaxSize);
        }

        op.parent = self.head_hash();

        let new_composed = match &self.composed {
            None => op.clone(),
            Some(composed) => match compose(composed, &op) {
                Ok(next) => next,
                Err(_) => {
                    warn!("append failed: new op does not compose onto history");
                    return Err(OtError::AppendFailed);
                }
            },
        };

        let hash = hash_snapshot(&new_composed.snapshot());
        let mut new_composed = new_composed;
        new_composed.hash = hash;
        op.hash = hash;

        self.size = new_composed.size();
        self.composed = Some(new_composed);
        self.history.push(op);

        debug!(len = self.history.len(), size = self.size, "appended op to document");
        Ok(self.history.last().expect("just pushed"))
    }

    /// Folds every op from (and excluding) the one whose hash is `after`
    /// through the end of history. `after == ZERO_HASH` folds the whole
    /// history. Returns `None` if `after` isn't the zero hash and isn't
    /// found in history.
    pub fn compose_after(&self, after: &Hash) -> Option<Op> {
        if self.history.is_empty() {
            return None;
        }

        let start = if *after == ZERO_HASH {
            0
        } else {
            let found = self.history.iter().rposition(|op| op.hash == *after)?;
            found + 1
        };

        if start >= self.history.len() {
            return None;
        }

        let mut composed = self.history[start].clone();
        for op in &self.history[start + 1..] {
            composed = compose(&composed, op).ok()?;
        }
        Some(composed)
    }

    /// The most recently appended op, or `None` if the document is empty.
    pub fn last(&self) -> Option<&Op> {
        self.history.last()
    }
}
