//! Plugin lifecycle hooks.
//!
//! Plugins declare callbacks with [`PluginHooks::builder`]; the host collects
//! them in a [`HookRegistry`] and dispatches by hook name and entity kind.
//! Callbacks run in ascending priority. A failing or panicking callback is
//! reported in the [`DispatchReport`] and never prevents the ones after it.

mod dispatch;
mod name;
mod registry;

pub use dispatch::{DispatchReport, HookFailure, HookInvocation, TransformOutcome};
pub use name::{HookKind, HookName};
pub use registry::{
    HookCallback, HookContext, HookRegistration, HookRegistry, PluginHooks, PluginHooksBuilder,
};
