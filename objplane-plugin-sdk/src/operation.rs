//! Cross-entity operations: a planned batch of creates, updates and deletes
//! that is permission-checked as a whole and executed atomically.

use crate::atomic::{run_atomic, AtomicOperation, PendingLog};
use crate::context::PluginContext;
use crate::error::{SdkError, SdkResult};
use crate::hooks::{HookContext, HookName};
use crate::permissions::{EntryPermission, PermissionCheckResult};
use objplane_model::{Entry, EntryData};
use objplane_storage::AuditStatus;
use objplane_types::{AclType, EntryId, OperationId, Principal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{error, info, warn};

/// What a planned entry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryAction {
    Create,
    Update,
    Delete,
}

impl EntryAction {
    fn after_hook(&self) -> &'static str {
        match self {
            Self::Create => "entry.after_create",
            Self::Update => "entry.after_update",
            Self::Delete => "entry.after_delete",
        }
    }
}

/// Audit classification of a whole operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Read,
    Update,
    Delete,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    Pending,
    InProgress,
    Completed,
    Failed,
    RolledBack,
}

/// One planned mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEntry {
    pub entity_name: String,
    /// Absent for creates.
    pub entry_id: Option<EntryId>,
    pub data: EntryData,
    pub action: EntryAction,
    /// Resulting record, set once the operation completed.
    pub result: Option<Entry>,
}

/// Outcome of [`CrossEntityOperation::execute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub operation_type: OperationType,
    pub affected_count: usize,
    pub entries: Vec<Entry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Audit log id of the run, when one was opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<OperationId>,
}

/// Link written between results after all entries ran.
#[derive(Debug, Clone)]
struct PlannedLink {
    source: usize,
    targets: Vec<usize>,
    attribute: String,
}

/// A batch of mutations across entity kinds.
///
/// Entries execute strictly in the order they were added; a later entry may
/// rely on the effects of an earlier one.
pub struct CrossEntityOperation<'a> {
    ctx: &'a PluginContext,
    user: &'a Principal,
    plugin_id: String,
    entries: Vec<OperationEntry>,
    links: Vec<PlannedLink>,
    state: OperationState,
}

impl<'a> CrossEntityOperation<'a> {
    pub fn new(ctx: &'a PluginContext, user: &'a Principal, plugin_id: impl Into<String>) -> Self {
        Self {
            ctx,
            user,
            plugin_id: plugin_id.into(),
            entries: Vec::new(),
            links: Vec::new(),
            state: OperationState::Pending,
        }
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn entries(&self) -> &[OperationEntry] {
        &self.entries
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn add_create(&mut self, entity: &str, data: EntryData) -> SdkResult<&mut Self> {
        self.push(entity, None, data, EntryAction::Create)
    }

    pub fn add_update(&mut self, entity: &str, id: EntryId, data: EntryData) -> SdkResult<&mut Self> {
        self.push(entity, Some(id), data, EntryAction::Update)
    }

    pub fn add_delete(&mut self, entity: &str, id: EntryId) -> SdkResult<&mut Self> {
        self.push(entity, Some(id), EntryData::default(), EntryAction::Delete)
    }

    /// Plans a best-effort link from the result of entry `source` to the
    /// results of `targets` (indices into the entry list) via `attribute`.
    pub fn link_results(
        &mut self,
        source: usize,
        targets: Vec<usize>,
        attribute: impl Into<String>,
    ) -> &mut Self {
        self.links.push(PlannedLink {
            source,
            targets,
            attribute: attribute.into(),
        });
        self
    }

    fn push(
        &mut self,
        entity: &str,
        entry_id: Option<EntryId>,
        data: EntryData,
        action: EntryAction,
    ) -> SdkResult<&mut Self> {
        if self.state != OperationState::Pending {
            return Err(SdkError::InvalidState(format!(
                "cannot add entries in state {:?}",
                self.state
            )));
        }
        if entity.trim().is_empty() {
            return Err(SdkError::Validation("entity name must not be empty".into()));
        }
        self.entries.push(OperationEntry {
            entity_name: entity.to_string(),
            entry_id,
            data,
            action,
            result: None,
        });
        Ok(self)
    }

    /// Most destructive action wins: delete, then create, then update.
    pub fn operation_type(&self) -> OperationType {
        let has = |action: EntryAction| self.entries.iter().any(|e| e.action == action);
        if has(EntryAction::Delete) {
            OperationType::Delete
        } else if has(EntryAction::Create) {
            OperationType::Create
        } else if has(EntryAction::Update) {
            OperationType::Update
        } else {
            OperationType::Read
        }
    }

    /// Checks updates (`Writable`) and deletes (`Full`) against the stored
    /// records, then create permission on each distinct target kind.
    ///
    /// Returns the first phase that is not fully granted; later phases are
    /// not evaluated in that case. An update or delete whose id does not
    /// resolve to an active entry is reported as denied.
    pub fn pre_check_permissions(&self) -> SdkResult<PermissionCheckResult> {
        let checker = self.ctx.permission_checker(self.user);

        let existing: Vec<&OperationEntry> = self
            .entries
            .iter()
            .filter(|e| e.action != EntryAction::Create)
            .collect();
        let ids: Vec<EntryId> = existing.iter().filter_map(|e| e.entry_id).collect();
        let resolved: HashMap<EntryId, Entry> = self
            .ctx
            .store()
            .filter_active(&ids)?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();

        let evaluations: Vec<EntryPermission> = existing
            .iter()
            .map(|planned| {
                let required = match planned.action {
                    EntryAction::Delete => AclType::Full,
                    _ => AclType::Writable,
                };
                let id = planned.entry_id.unwrap_or(EntryId::UNSAVED);
                match resolved.get(&id) {
                    Some(entry) => checker.evaluate_entry(entry, required),
                    None => EntryPermission {
                        entry_id: id,
                        entity_name: planned.entity_name.clone(),
                        entry_name: String::new(),
                        required_permission: required,
                        granted: false,
                        reason: Some(format!("entry {id} not found or inactive")),
                    },
                }
            })
            .collect();
        let existing_result = PermissionCheckResult::from_evaluations(evaluations);
        if !existing_result.all_granted {
            return Ok(existing_result);
        }

        let mut create_entities: Vec<&str> = Vec::new();
        for planned in self.entries.iter().filter(|e| e.action == EntryAction::Create) {
            if !create_entities.contains(&planned.entity_name.as_str()) {
                create_entities.push(&planned.entity_name);
            }
        }
        let create_result = checker.check_entity_create_permission(&create_entities)?;
        if !create_result.all_granted {
            return Ok(create_result);
        }

        Ok(existing_result.merge(create_result))
    }

    /// Runs the operation.
    ///
    /// A denied pre-check returns `Err(PermissionDenied)` and writes nothing.
    /// Any failure after the transaction opened is rolled back and reported
    /// as `Ok(OperationResult { success: false, .. })`.
    pub fn execute(&mut self) -> SdkResult<OperationResult> {
        if self.state != OperationState::Pending {
            return Err(SdkError::InvalidState(format!(
                "operation already executed (state {:?})",
                self.state
            )));
        }
        self.state = OperationState::InProgress;
        let operation_type = self.operation_type();

        let check = match self.pre_check_permissions() {
            Ok(check) => check,
            Err(e) => {
                self.state = OperationState::Failed;
                return Err(e);
            }
        };
        if !check.all_granted {
            self.state = OperationState::Failed;
            warn!(
                plugin_id = %self.plugin_id,
                user = %self.user.name,
                denied = check.denied.len(),
                "Cross-entity operation denied"
            );
            self.record_denied(operation_type, &check);
            return Err(SdkError::PermissionDenied {
                denied: check.denied,
            });
        }

        let hard_delete = self.ctx.config().operations.hard_delete;
        let plugin_id = self.plugin_id.clone();
        let entries = &self.entries;
        let links = &self.links;
        let mut operation_id = None;

        let outcome = run_atomic(
            self.ctx,
            self.user,
            |atomic| {
                operation_id = atomic.operation_id();
                atomic.log_summary(&plugin_id, operation_type.as_str(), None, None);
            },
            |atomic| {
                let mut results = Vec::with_capacity(entries.len());
                for planned in entries {
                    results.push(apply_entry(atomic, planned, hard_delete)?);
                }
                for link in links {
                    apply_link(atomic, link, &mut results);
                }
                Ok(results)
            },
        );

        match outcome {
            Ok(results) => {
                for (planned, result) in self.entries.iter_mut().zip(results.iter()) {
                    planned.result = Some(result.clone());
                }
                self.state = OperationState::Completed;
                info!(
                    plugin_id = %self.plugin_id,
                    operation = %operation_type,
                    affected = results.len(),
                    "Cross-entity operation committed"
                );
                self.fire_after_hooks();
                Ok(OperationResult {
                    success: true,
                    operation_type,
                    affected_count: results.len(),
                    entries: results,
                    error: None,
                    operation_id,
                })
            }
            Err(e) => {
                self.state = OperationState::RolledBack;
                error!(plugin_id = %self.plugin_id, "Cross-entity operation rolled back: {}", e);
                Ok(OperationResult {
                    success: false,
                    operation_type,
                    affected_count: 0,
                    entries: Vec::new(),
                    error: Some(e.to_string()),
                    operation_id,
                })
            }
        }
    }

    fn record_denied(&self, operation_type: OperationType, check: &PermissionCheckResult) {
        let mut log = PendingLog::start(self.user);
        let entities: Vec<String> = {
            let mut names: Vec<String> = self.entries.iter().map(|e| e.entity_name.clone()).collect();
            names.sort();
            names.dedup();
            names
        };
        log.describe(&self.plugin_id, operation_type.as_str(), Some(0), Some(entities));
        match serde_json::to_value(&check.denied) {
            Ok(denied) => log.set_details(serde_json::json!({ "denied": denied })),
            Err(e) => warn!("Failed to serialize denied entries: {}", e),
        }
        let log = log.finalize(
            AuditStatus::Denied,
            Some(format!("permission denied for {} entries", check.denied.len())),
            0,
            Vec::new(),
        );
        self.ctx.record_audit(&log);
    }

    fn fire_after_hooks(&self) {
        if !self.ctx.config().hooks.fire_after_commit {
            return;
        }
        let Some(hooks) = self.ctx.hooks() else {
            return;
        };
        let hook_ctx = HookContext::new(&self.plugin_id).with_user(self.user.clone());

        for planned in &self.entries {
            let Some(entry) = planned.result.as_ref() else {
                continue;
            };
            let hook = match HookName::parse(planned.action.after_hook()) {
                Ok(hook) => hook,
                Err(e) => {
                    warn!("Invalid lifecycle hook name: {}", e);
                    continue;
                }
            };
            let payload = match serde_json::to_value(entry) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(entry_id = %entry.id, "Failed to serialize hook payload: {}", e);
                    continue;
                }
            };
            let report = hooks.dispatch(&hook, Some(entry.entity_name.as_str()), &payload, &hook_ctx);
            for failure in report.failures() {
                warn!(
                    hook = %hook,
                    plugin_id = %failure.plugin_id,
                    entry_id = %entry.id,
                    "Lifecycle hook failed: {}",
                    failure.message
                );
            }
        }
    }
}

fn apply_entry(
    atomic: &mut AtomicOperation<'_>,
    planned: &OperationEntry,
    hard_delete: bool,
) -> SdkResult<Entry> {
    match planned.action {
        EntryAction::Create => {
            let name = planned.data.name.as_deref().ok_or_else(|| {
                SdkError::Validation(format!(
                    "create on '{}' requires a name",
                    planned.entity_name
                ))
            })?;
            atomic.create_entry(&planned.entity_name, name, &planned.data.attrs)
        }
        EntryAction::Update => {
            let entry = load_active(atomic, planned)?;
            atomic.update_entry(entry, &planned.data)
        }
        EntryAction::Delete => {
            let mut entry = load_active(atomic, planned)?;
            atomic.delete_entry(&entry, hard_delete)?;
            entry.is_active = false;
            Ok(entry)
        }
    }
}

fn load_active(atomic: &AtomicOperation<'_>, planned: &OperationEntry) -> SdkResult<Entry> {
    let id = planned
        .entry_id
        .ok_or_else(|| SdkError::Validation("update and delete require an entry id".into()))?;
    atomic
        .store()
        .get_entry(id)?
        .filter(|e| e.is_active && e.entity_name == planned.entity_name)
        .ok_or(SdkError::EntryNotFound(id))
}

fn apply_link(atomic: &mut AtomicOperation<'_>, link: &PlannedLink, results: &mut [Entry]) {
    let targets: Vec<Entry> = link
        .targets
        .iter()
        .filter_map(|&i| results.get(i).cloned())
        .collect();
    if targets.len() != link.targets.len() {
        warn!(attribute = %link.attribute, "Link skipped, target index out of range");
        return;
    }
    match results.get_mut(link.source) {
        Some(source) => {
            atomic.link_entries(source, &targets, &link.attribute);
        }
        None => warn!(attribute = %link.attribute, "Link skipped, source index out of range"),
    }
}
