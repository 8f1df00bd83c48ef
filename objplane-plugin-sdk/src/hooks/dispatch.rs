use super::name::{HookKind, HookName};
use super::registry::{HookContext, HookRegistration, HookRegistry};
use crate::error::{SdkError, SdkResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// One callback call, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookInvocation {
    pub plugin_id: String,
    pub priority: i32,
    /// Declaration order within the plugin.
    pub sequence: usize,
    pub succeeded: bool,
}

impl HookInvocation {
    fn of(registration: &HookRegistration, succeeded: bool) -> Self {
        Self {
            plugin_id: registration.plugin_id.clone(),
            priority: registration.priority,
            sequence: registration.sequence,
            succeeded,
        }
    }
}

/// A callback that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookFailure {
    pub plugin_id: String,
    pub hook: String,
    pub priority: i32,
    pub sequence: usize,
    pub message: String,
}

/// What one dispatch did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    hook: String,
    invoked: Vec<HookInvocation>,
    failures: Vec<HookFailure>,
}

impl DispatchReport {
    fn new(hook: &HookName) -> Self {
        Self {
            hook: hook.to_string(),
            ..Self::default()
        }
    }

    pub fn hook(&self) -> &str {
        &self.hook
    }

    pub fn invoked(&self) -> &[HookInvocation] {
        &self.invoked
    }

    pub fn succeeded(&self) -> usize {
        self.invoked.len() - self.failures.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &HookFailure> {
        self.failures.iter()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Err(HookFailed)` if any callback failed.
    pub fn into_result(self) -> SdkResult<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(SdkError::HookFailed {
                hook: self.hook,
                failures: self.failures,
            })
        }
    }
}

/// Final value of a transform chain plus the report of how it got there.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    pub value: Value,
    pub report: DispatchReport,
}

impl HookRegistry {
    /// Calls every matching callback with the same payload, in priority
    /// order. Errors and panics are recorded and never stop later callbacks.
    pub fn dispatch(
        &self,
        hook: &HookName,
        entity: Option<&str>,
        payload: &Value,
        ctx: &HookContext,
    ) -> DispatchReport {
        let ctx = ctx.clone().with_entity(entity);
        let mut report = DispatchReport::new(hook);

        for registration in self.registrations_for(hook, entity) {
            if let Err(message) = invoke(registration, &ctx, payload) {
                record_failure(&mut report, registration, message);
            } else {
                report.invoked.push(HookInvocation::of(registration, true));
            }
        }

        debug!(
            hook = %hook,
            entity = ?entity,
            invoked = report.invoked.len(),
            failed = report.failed(),
            "Dispatched hook"
        );
        report
    }

    /// Threads `value` through every matching callback. `Ok(Some(v))`
    /// replaces the value, `Ok(None)` passes it through, and a failing
    /// callback leaves it unchanged while the chain continues.
    pub fn dispatch_transform(
        &self,
        hook: &HookName,
        entity: Option<&str>,
        value: Value,
        ctx: &HookContext,
    ) -> SdkResult<TransformOutcome> {
        if hook.kind() != HookKind::Transform {
            return Err(SdkError::Validation(format!(
                "hook '{hook}' is not a transform hook"
            )));
        }

        let ctx = ctx.clone().with_entity(entity);
        let mut report = DispatchReport::new(hook);
        let mut value = value;

        for registration in self.registrations_for(hook, entity) {
            match invoke(registration, &ctx, &value) {
                Ok(Some(next)) => {
                    value = next;
                    report.invoked.push(HookInvocation::of(registration, true));
                }
                Ok(None) => report.invoked.push(HookInvocation::of(registration, true)),
                Err(message) => record_failure(&mut report, registration, message),
            }
        }

        debug!(
            hook = %hook,
            entity = ?entity,
            invoked = report.invoked.len(),
            failed = report.failed(),
            "Dispatched transform hook"
        );
        Ok(TransformOutcome { value, report })
    }
}

fn invoke(
    registration: &HookRegistration,
    ctx: &HookContext,
    payload: &Value,
) -> Result<Option<Value>, String> {
    let callback = &registration.callback;
    match catch_unwind(AssertUnwindSafe(|| callback(ctx, payload))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(panic) => Err(format!("callback panicked: {}", panic_message(&*panic))),
    }
}

fn record_failure(report: &mut DispatchReport, registration: &HookRegistration, message: String) {
    warn!(
        hook = %registration.hook,
        plugin_id = %registration.plugin_id,
        priority = registration.priority,
        sequence = registration.sequence,
        "Hook callback failed: {}",
        message
    );
    report.invoked.push(HookInvocation::of(registration, false));
    report.failures.push(HookFailure {
        plugin_id: registration.plugin_id.clone(),
        hook: registration.hook.to_string(),
        priority: registration.priority,
        sequence: registration.sequence,
        message,
    });
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
