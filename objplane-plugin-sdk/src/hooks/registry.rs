use super::name::HookName;
use crate::error::{SdkError, SdkResult};
use objplane_types::Principal;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Plugin callback. `Ok(None)` means "no change" for transform hooks and is
/// the normal return for notify and validate hooks.
pub type HookCallback =
    Arc<dyn Fn(&HookContext, &Value) -> anyhow::Result<Option<Value>> + Send + Sync>;

/// What a callback knows about the call that triggered it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookContext {
    /// Plugin that caused the event, not the plugin receiving it.
    pub plugin_id: String,
    pub user: Option<Principal>,
    pub entity: Option<String>,
}

impl HookContext {
    pub fn new(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            user: None,
            entity: None,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: Principal) -> Self {
        self.user = Some(user);
        self
    }

    #[must_use]
    pub fn with_entity(mut self, entity: Option<&str>) -> Self {
        self.entity = entity.map(str::to_string);
        self
    }
}

/// One collected callback.
#[derive(Clone)]
pub struct HookRegistration {
    pub hook: HookName,
    /// `None` applies to every entity kind.
    pub entity: Option<String>,
    /// Lower runs first.
    pub priority: i32,
    pub plugin_id: String,
    /// Declaration order within the owning plugin.
    pub sequence: usize,
    pub callback: HookCallback,
}

impl HookRegistration {
    /// True when this registration should run for `hook` on `entity`.
    pub fn matches(&self, hook: &HookName, entity: Option<&str>) -> bool {
        self.hook == *hook
            && match self.entity.as_deref() {
                None => true,
                Some(filter) => entity == Some(filter),
            }
    }
}

impl fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistration")
            .field("hook", &self.hook)
            .field("entity", &self.entity)
            .field("priority", &self.priority)
            .field("plugin_id", &self.plugin_id)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// The immutable set of hooks one plugin declares.
#[derive(Debug, Clone)]
pub struct PluginHooks {
    plugin_id: String,
    registrations: Vec<HookRegistration>,
}

impl PluginHooks {
    pub fn builder(plugin_id: impl Into<String>) -> PluginHooksBuilder {
        PluginHooksBuilder {
            plugin_id: plugin_id.into(),
            declared: Vec::new(),
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Sorted by ascending priority, then declaration order.
    pub fn registrations(&self) -> &[HookRegistration] {
        &self.registrations
    }
}

pub struct PluginHooksBuilder {
    plugin_id: String,
    declared: Vec<(String, Option<String>, i32, HookCallback)>,
}

impl PluginHooksBuilder {
    /// Declares a callback. The hook name is validated by [`build`](Self::build).
    #[must_use]
    pub fn on<F>(mut self, hook: &str, entity: Option<&str>, priority: i32, callback: F) -> Self
    where
        F: Fn(&HookContext, &Value) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        let callback: HookCallback = Arc::new(callback);
        self.declared
            .push((hook.to_string(), entity.map(str::to_string), priority, callback));
        self
    }

    pub fn build(self) -> SdkResult<PluginHooks> {
        if self.plugin_id.trim().is_empty() {
            return Err(SdkError::Validation("plugin id must not be empty".into()));
        }
        let mut registrations = self
            .declared
            .into_iter()
            .enumerate()
            .map(|(sequence, (hook, entity, priority, callback))| {
                Ok(HookRegistration {
                    hook: HookName::parse(&hook)?,
                    entity,
                    priority,
                    plugin_id: self.plugin_id.clone(),
                    sequence,
                    callback,
                })
            })
            .collect::<SdkResult<Vec<_>>>()?;
        registrations.sort_by_key(|r| (r.priority, r.sequence));

        Ok(PluginHooks {
            plugin_id: self.plugin_id,
            registrations,
        })
    }
}

/// Hooks of every registered plugin, in dispatch order.
#[derive(Debug, Default)]
pub struct HookRegistry {
    plugins: Vec<String>,
    registrations: Vec<HookRegistration>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin's hooks. Equal priorities keep plugin registration
    /// order, then declaration order.
    pub fn register_plugin(&mut self, hooks: PluginHooks) -> SdkResult<()> {
        if self.plugins.iter().any(|id| *id == hooks.plugin_id) {
            return Err(SdkError::Validation(format!(
                "plugin '{}' already registered hooks",
                hooks.plugin_id
            )));
        }

        let count = hooks.registrations.len();
        self.registrations.extend(hooks.registrations);
        // Stable: earlier plugins stay ahead at equal priority.
        self.registrations.sort_by_key(|r| r.priority);
        info!(plugin_id = %hooks.plugin_id, hooks = count, "Registered plugin hooks");
        self.plugins.push(hooks.plugin_id);
        Ok(())
    }

    /// Removes every hook of `plugin_id`. Returns whether it was registered.
    pub fn unregister_plugin(&mut self, plugin_id: &str) -> bool {
        let Some(pos) = self.plugins.iter().position(|id| id == plugin_id) else {
            return false;
        };
        self.plugins.remove(pos);
        self.registrations.retain(|r| r.plugin_id != plugin_id);
        debug!(plugin_id, "Unregistered plugin hooks");
        true
    }

    pub fn plugin_ids(&self) -> &[String] {
        &self.plugins
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registrations that a dispatch of `hook` on `entity` would invoke, in
    /// invocation order.
    pub fn registrations_for<'a>(
        &'a self,
        hook: &'a HookName,
        entity: Option<&'a str>,
    ) -> impl Iterator<Item = &'a HookRegistration> + 'a {
        self.registrations
            .iter()
            .filter(move |r| r.matches(hook, entity))
    }
}
