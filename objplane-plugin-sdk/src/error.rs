//! Error types for the plugin SDK.

use crate::hooks::HookFailure;
use crate::permissions::EntryPermission;
use objplane_model::ModelError;
use objplane_storage::StorageError;
use objplane_types::EntryId;
use thiserror::Error;

/// Result type for SDK operations.
pub type SdkResult<T> = Result<T, SdkError>;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Raised before any write; carries every denied check.
    #[error("permission denied for {} entr{}", denied.len(), if denied.len() == 1 { "y" } else { "ies" })]
    PermissionDenied { denied: Vec<EntryPermission> },

    #[error("operation failed: {0}")]
    Operation(String),

    #[error("invalid operation state: {0}")]
    InvalidState(String),

    #[error("hook '{hook}' failed in {} callback(s)", failures.len())]
    HookFailed {
        hook: String,
        failures: Vec<HookFailure>,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SdkError {
    /// Denied checks, when this is a permission error.
    pub fn denied_entries(&self) -> Option<&[EntryPermission]> {
        match self {
            Self::PermissionDenied { denied } => Some(denied),
            _ => None,
        }
    }
}
