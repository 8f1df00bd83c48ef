//! Error types for the storage layer.

use objplane_types::EntryId;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors a record store or transaction primitive can report.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Entity kind does not exist or is inactive.
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    /// Entry does not exist.
    #[error("entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Attribute is not declared on the entry's entity kind.
    #[error("attribute '{attribute}' not found on entity '{entity}'")]
    AttributeNotFound { entity: String, attribute: String },

    /// Transaction misuse (nested begin, commit without begin, ...).
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Concurrent write detected.
    #[error("write conflict on entry {0}")]
    Conflict(EntryId),

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
