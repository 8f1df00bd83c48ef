//! Core type definitions for objplane.
//!
//! This crate defines the small, host-agnostic types shared by every other
//! objplane crate:
//! - Entry and operation identifiers
//! - ACL levels used by permission checks
//! - The acting principal (user) of an operation
//!
//! Record and entity shapes live in `objplane-model`; the capabilities a host
//! must provide live in `objplane-storage`.

mod acl;
mod ids;
mod principal;

pub use acl::AclType;
pub use ids::{EntryId, OperationId};
pub use principal::Principal;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid operation id: {0}")]
    InvalidOperationId(#[from] uuid::Error),

    #[error("invalid entry id: {0}")]
    InvalidEntryId(String),

    #[error("invalid ACL level: {0}")]
    InvalidAclLevel(String),
}
