//! Shared fixtures for plugin SDK tests.

#![allow(dead_code)]

use objplane_model::{Attrs, Entry};
use objplane_plugin_sdk::{HookRegistry, PluginContext, SdkConfig};
use objplane_storage::{MemoryAuditSink, MemoryAuthorizer, MemoryStore};
use objplane_types::{EntryId, Principal};
use std::sync::Arc;

pub const PLUGIN: &str = "plugin-x";

/// A context over in-memory capabilities, with handles kept for assertions.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub audit: Arc<MemoryAuditSink>,
    pub ctx: PluginContext,
    pub user: Principal,
}

impl Fixture {
    pub fn new(authorizer: MemoryAuthorizer) -> Self {
        Self::build(authorizer, SdkConfig::default(), None)
    }

    pub fn with_config(authorizer: MemoryAuthorizer, config: SdkConfig) -> Self {
        Self::build(authorizer, config, None)
    }

    pub fn with_hooks(authorizer: MemoryAuthorizer, hooks: HookRegistry) -> Self {
        Self::build(authorizer, SdkConfig::default(), Some(Arc::new(hooks)))
    }

    fn build(
        authorizer: MemoryAuthorizer,
        config: SdkConfig,
        hooks: Option<Arc<HookRegistry>>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        store
            .register_entity("Service", &["configurations", "owner"])
            .unwrap();
        store
            .register_entity("Configuration", &["service", "settings"])
            .unwrap();
        store.register_entity("Setting", &["value"]).unwrap();

        let audit = Arc::new(MemoryAuditSink::new());
        let mut ctx = PluginContext::new(store.clone(), Arc::new(authorizer), audit.clone())
            .with_config(config);
        if let Some(hooks) = hooks {
            ctx = ctx.with_hooks(hooks);
        }

        Self {
            store,
            audit,
            ctx,
            user: Principal::new(7, "alice"),
        }
    }

    pub fn seed(&self, entity: &str, id: u64, name: &str) -> Entry {
        self.store
            .insert_entry(entity, EntryId::new(id), name, Attrs::new())
            .unwrap()
    }

    pub fn active_names(&self, entity: &str) -> Vec<String> {
        self.store
            .active_entries(entity)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect()
    }
}
