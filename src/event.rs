//! Observability events fired by [`crate::client::Client`] and
//! [`crate::server::Server`] sessions.

use crate::op::Op;

/// The kinds of events a session can report through its `event` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Connected,
    Disconnected,
    /// A foreign operation was received and applied to the local document.
    OpApplied,
    /// A foreign operation arrived and is about to be reconciled.
    OpIncoming,
    Error,
}

/// Emitted alongside an [`EventType`]; carries the relevant op when one
/// exists (`OpApplied`), or nothing otherwise.
pub struct Event<'a> {
    pub kind: EventType,
    pub op: Option<&'a Op>,
}
