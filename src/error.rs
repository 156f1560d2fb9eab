//! The crate's single error type.
//!
//! The numeric discriminants below are part of the external interface, not
//! an implementation detail — they appear on the wire as `{"errorCode": N}`,
//! so don't renumber them.

use std::fmt;

/// Everything that can go wrong decoding, composing, transforming, or
/// appending an operation.
///
/// There is deliberately no "no error" variant — absence of error is
/// `Result::Ok`, per the "error channel" design note: callers are forced
/// to handle both outcomes instead of checking a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtError {
    ParentMissing = 1,
    ClientIdMissing = 2,
    ComponentsMissing = 3,
    InvalidComponent = 4,
    HashMissing = 5,
    InvalidJson = 6,
    BufferFailed = 7,
    AppendFailed = 8,
    XformFailed = 9,
    ComposeFailed = 10,
    MaxSize = 11,
}

impl OtError {
    /// The wire-visible `errorCode` value for this error.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Reconstructs an `OtError` from a wire `errorCode`. Returns `None`
    /// for codes this crate doesn't recognize (e.g. from a future wire
    /// version).
    pub fn from_code(code: i32) -> Option<Self> {
        use OtError::*;
        Some(match code {
            1 => ParentMissing,
            2 => ClientIdMissing,
            3 => ComponentsMissing,
            4 => InvalidComponent,
            5 => HashMissing,
            6 => InvalidJson,
            7 => BufferFailed,
            8 => AppendFailed,
            9 => XformFailed,
            10 => ComposeFailed,
            11 => MaxSize,
            _ => return None,
        })
    }
}

impl fmt::Display for OtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            OtError::ParentMissing => "operation is missing its parent field",
            OtError::ClientIdMissing => "operation is missing its clientId field",
            OtError::ComponentsMissing => "operation is missing its components field",
            OtError::InvalidComponent => "operation contains an unrecognized component type",
            OtError::HashMissing => "operation is missing its hash field",
            OtError::InvalidJson => "input is not valid JSON",
            OtError::BufferFailed => "local edit could not be composed into the send buffer",
            OtError::AppendFailed => "operation could not be composed onto the document history",
            OtError::XformFailed => "operations could not be transformed against each other",
            OtError::ComposeFailed => "operations could not be composed",
            OtError::MaxSize => "operation would exceed the document's maximum size",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for OtError {}

pub type OtResult<T> = Result<T, OtError>;
