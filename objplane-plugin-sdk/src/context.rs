use crate::config::SdkConfig;
use crate::hooks::HookRegistry;
use crate::permissions::PermissionChecker;
use objplane_storage::{AuditSink, Authorizer, OperationLog, RecordStore};
use objplane_types::Principal;
use std::sync::Arc;
use tracing::debug;

/// Host capabilities and settings handed to every SDK entry point.
///
/// Cheap to clone; all capabilities are shared.
#[derive(Clone)]
pub struct PluginContext {
    store: Arc<dyn RecordStore>,
    authorizer: Arc<dyn Authorizer>,
    audit: Arc<dyn AuditSink>,
    hooks: Option<Arc<HookRegistry>>,
    config: SdkConfig,
}

impl PluginContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        authorizer: Arc<dyn Authorizer>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            authorizer,
            audit,
            hooks: None,
            config: SdkConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SdkConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn authorizer(&self) -> &dyn Authorizer {
        self.authorizer.as_ref()
    }

    pub fn hooks(&self) -> Option<&HookRegistry> {
        self.hooks.as_deref()
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Permission checker acting on behalf of `user`.
    pub fn permission_checker<'a>(&'a self, user: &'a Principal) -> PermissionChecker<'a> {
        PermissionChecker::new(self.store(), self.authorizer(), user)
    }

    pub(crate) fn record_audit(&self, log: &OperationLog) {
        if self.config.audit.enabled {
            self.audit.record(log);
        } else {
            debug!(operation_id = %log.id, "Audit disabled, log not recorded");
        }
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("hooks", &self.hooks.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
