//! Plugin SDK core for objplane.
//!
//! Lets a plugin change records that span several entity kinds as one unit:
//! permissions for every planned mutation are checked up front, the
//! mutations run inside a single host transaction, and each run leaves
//! exactly one audit record behind. Plugins also register lifecycle hooks
//! which the host dispatches in priority order, isolating failures per
//! callback.
//!
//! All host access goes through the capabilities bundled in a
//! [`PluginContext`]; nothing here holds global state.

mod atomic;
mod composite;
mod config;
mod context;
mod error;
pub mod hooks;
mod operation;
mod permissions;

pub use atomic::{with_atomic_operation, AtomicOperation};
pub use composite::{create_composite, CompositeEntry, RelatedData};
pub use config::{AuditConfig, CompositeConfig, HooksConfig, OperationsConfig, SdkConfig};
pub use context::PluginContext;
pub use error::{SdkError, SdkResult};
pub use hooks::{
    DispatchReport, HookContext, HookFailure, HookInvocation, HookKind, HookName, HookRegistration,
    HookRegistry, PluginHooks, TransformOutcome,
};
pub use operation::{
    CrossEntityOperation, EntryAction, OperationEntry, OperationResult, OperationState,
    OperationType,
};
pub use permissions::{EntryPermission, PermissionCheckResult, PermissionChecker};
