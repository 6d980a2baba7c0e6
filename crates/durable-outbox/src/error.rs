//! Outbox error types.

use crate::EntryId;
use thiserror::Error;

/// Outbox error type.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// The storage medium itself failed. Never swallowed.
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record is malformed.
    #[error("Corrupt outbox entry {id}: {reason}")]
    CorruptEntry { id: EntryId, reason: String },

    /// The entry is gone, usually removed by a concurrent retry.
    #[error("Outbox entry not found: {0}")]
    NotFound(EntryId),

    /// A request field cannot be represented in the line-based record.
    #[error("Field '{field}' contains a line break and cannot be stored")]
    UnencodableField { field: &'static str },
}

/// Result type alias using OutboxError.
pub type OutboxResult<T> = Result<T, OutboxError>;
