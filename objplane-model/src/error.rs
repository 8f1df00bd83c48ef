//! Error types for the model layer.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A declaration was malformed and has not been applied.
    #[error("validation error: {0}")]
    Validation(String),

    /// Registering the relationship would close a cycle.
    #[error("circular reference: {source_entity} -> {target_entity} would create a cycle")]
    CircularReference {
        source_entity: String,
        target_entity: String,
    },
}
