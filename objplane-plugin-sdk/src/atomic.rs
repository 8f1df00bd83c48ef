//! Scoped atomic operations over the host record store.
//!
//! [`with_atomic_operation`] opens one transaction, hands the closure an
//! [`AtomicOperation`], and on exit either commits or rolls back. The
//! pending audit log is finalized exactly once on every path, including a
//! panic inside the closure (the operation's `Drop` rolls back and records
//! the log as failed).

use crate::context::PluginContext;
use crate::error::{SdkError, SdkResult};
use chrono::{DateTime, Utc};
use objplane_model::{Attrs, Entry, EntryData, RelationshipRegistry};
use objplane_storage::{AuditStatus, OperationLog, RecordStore};
use objplane_types::{EntryId, OperationId, Principal};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, error, warn};

/// Audit record under construction. Consumed by `finalize`, so it can be
/// finalized only once.
#[derive(Debug)]
pub(crate) struct PendingLog {
    id: OperationId,
    plugin_id: String,
    user: Principal,
    operation: String,
    affected_count: Option<usize>,
    entities: Option<Vec<String>>,
    started_at: DateTime<Utc>,
    details: Value,
}

impl PendingLog {
    pub(crate) fn start(user: &Principal) -> Self {
        Self {
            id: OperationId::new(),
            plugin_id: String::new(),
            user: user.clone(),
            operation: "atomic".to_string(),
            affected_count: None,
            entities: None,
            started_at: Utc::now(),
            details: Value::Null,
        }
    }

    pub(crate) fn describe(
        &mut self,
        plugin_id: &str,
        operation: &str,
        affected_count: Option<usize>,
        entities: Option<Vec<String>>,
    ) {
        self.plugin_id = plugin_id.to_string();
        self.operation = operation.to_string();
        self.affected_count = affected_count;
        self.entities = entities;
    }

    pub(crate) fn set_details(&mut self, details: Value) {
        self.details = details;
    }

    pub(crate) fn finalize(
        self,
        status: AuditStatus,
        error: Option<String>,
        default_count: usize,
        default_entities: Vec<String>,
    ) -> OperationLog {
        let ended_at = Utc::now();
        OperationLog {
            id: self.id,
            plugin_id: self.plugin_id,
            user_id: self.user.id,
            user_name: self.user.name,
            operation: self.operation,
            affected_count: self.affected_count.unwrap_or(default_count),
            entities: self.entities.unwrap_or(default_entities),
            status,
            started_at: self.started_at,
            ended_at,
            duration_ms: (ended_at - self.started_at).num_milliseconds(),
            error,
            details: self.details,
        }
    }
}

/// One open unit of work. Obtained only through [`with_atomic_operation`].
pub struct AtomicOperation<'a> {
    ctx: &'a PluginContext,
    user: &'a Principal,
    log: Option<PendingLog>,
    created: Vec<Entry>,
    updated: Vec<Entry>,
    deleted: Vec<EntryId>,
    deleted_entities: Vec<String>,
}

impl<'a> AtomicOperation<'a> {
    fn open(ctx: &'a PluginContext, user: &'a Principal) -> Self {
        Self {
            ctx,
            user,
            log: Some(PendingLog::start(user)),
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
            deleted_entities: Vec::new(),
        }
    }

    pub fn user(&self) -> &Principal {
        self.user
    }

    pub(crate) fn store(&self) -> &dyn RecordStore {
        self.ctx.store()
    }

    /// Id of the audit log this operation will produce.
    pub fn operation_id(&self) -> Option<OperationId> {
        self.log.as_ref().map(|log| log.id)
    }

    pub fn created_entries(&self) -> &[Entry] {
        &self.created
    }

    pub fn updated_entries(&self) -> &[Entry] {
        &self.updated
    }

    pub fn deleted_entries(&self) -> &[EntryId] {
        &self.deleted
    }

    /// Creates an entry of `entity_name` owned by the acting user.
    pub fn create_entry(&mut self, entity_name: &str, name: &str, attrs: &Attrs) -> SdkResult<Entry> {
        let store = self.ctx.store();
        let kind = store
            .resolve_entity(entity_name)?
            .ok_or_else(|| SdkError::EntityNotFound(entity_name.to_string()))?;

        let mut entry = store.create_entry(&kind, name, self.user)?;
        if !attrs.is_empty() {
            entry.attrs.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
            store.save_entry(&entry)?;
        }

        debug!(entity = %entity_name, entry_id = %entry.id, "Created entry");
        self.created.push(entry.clone());
        Ok(entry)
    }

    /// Applies a name/attribute delta and persists it.
    pub fn update_entry(&mut self, mut entry: Entry, data: &EntryData) -> SdkResult<Entry> {
        data.apply_to(&mut entry);
        self.ctx.store().save_entry(&entry)?;

        debug!(entity = %entry.entity_name, entry_id = %entry.id, "Updated entry");
        self.updated.push(entry.clone());
        Ok(entry)
    }

    /// Soft-deletes by default; `hard_delete` removes the record.
    pub fn delete_entry(&mut self, entry: &Entry, hard_delete: bool) -> SdkResult<()> {
        self.ctx.store().delete_entry(entry.id, hard_delete)?;

        debug!(entity = %entry.entity_name, entry_id = %entry.id, hard_delete, "Deleted entry");
        self.deleted.push(entry.id);
        self.deleted_entities.push(entry.entity_name.clone());
        Ok(())
    }

    /// Deletes `entry` and everything reachable through cascade-delete
    /// relationships. Returns deleted ids in deletion order.
    pub fn delete_with_cascade(
        &mut self,
        entry: &Entry,
        registry: &RelationshipRegistry,
        hard_delete: bool,
    ) -> SdkResult<Vec<EntryId>> {
        let mut pending = vec![entry.clone()];
        let mut seen: HashSet<EntryId> = HashSet::new();
        let mut removed = Vec::new();

        while let Some(current) = pending.pop() {
            if !seen.insert(current.id) {
                continue;
            }
            for rel in registry.cascade_delete_targets(&current.entity_name) {
                let ids = current.referenced_ids(rel.attribute_name());
                let children = self.ctx.store().filter_active(&ids)?;
                pending.extend(
                    children
                        .into_iter()
                        .filter(|child| child.entity_name == rel.target_entity()),
                );
            }
            self.delete_entry(&current, hard_delete)?;
            removed.push(current.id);
        }
        Ok(removed)
    }

    /// Best-effort: points `attribute` on `source` at `targets`. One target
    /// is stored as an id, several as an array. Failures are logged and
    /// swallowed; returns whether the link was written. On success the
    /// attribute is also set on `source`.
    pub fn link_entries(&mut self, source: &mut Entry, targets: &[Entry], attribute: &str) -> bool {
        let store = self.ctx.store();
        let declared = match store.resolve_entity(&source.entity_name) {
            Ok(Some(kind)) => kind.has_attribute(attribute),
            Ok(None) => false,
            Err(e) => {
                warn!(entry_id = %source.id, attribute, "Link skipped, entity lookup failed: {}", e);
                return false;
            }
        };
        if !declared {
            warn!(
                entity = %source.entity_name,
                attribute,
                "Link skipped, attribute not declared"
            );
            return false;
        }

        let value = match targets {
            [single] => Value::from(single.id.get()),
            many => Value::Array(many.iter().map(|t| Value::from(t.id.get())).collect()),
        };
        match store.set_attr(source.id, attribute, value.clone()) {
            Ok(()) => {
                source.attrs.insert(attribute.to_string(), value);
                debug!(entry_id = %source.id, attribute, targets = targets.len(), "Linked entries");
                true
            }
            Err(e) => {
                warn!(entry_id = %source.id, attribute, "Link failed: {}", e);
                false
            }
        }
    }

    /// Fills the descriptive fields of the pending log. `None` counts and
    /// entities default to what this operation tracked.
    pub fn log_summary(
        &mut self,
        plugin_id: &str,
        operation: &str,
        affected_count: Option<usize>,
        entities: Option<Vec<String>>,
    ) {
        if let Some(log) = self.log.as_mut() {
            log.describe(plugin_id, operation, affected_count, entities);
        }
    }

    /// Attaches free-form details to the pending log.
    pub fn log_details(&mut self, details: Value) {
        if let Some(log) = self.log.as_mut() {
            log.set_details(details);
        }
    }

    fn tracked_count(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    fn tracked_entities(&self) -> Vec<String> {
        self.created
            .iter()
            .chain(self.updated.iter())
            .map(|e| e.entity_name.clone())
            .chain(self.deleted_entities.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn finalize(&mut self, status: AuditStatus, error: Option<String>) {
        if let Some(log) = self.log.take() {
            let log = log.finalize(status, error, self.tracked_count(), self.tracked_entities());
            self.ctx.record_audit(&log);
        }
    }

    /// Commits and records the log as `success`. A failed commit is
    /// rolled back and recorded as `failed`.
    fn complete(mut self) -> SdkResult<()> {
        match self.ctx.store().commit() {
            Ok(()) => {
                self.finalize(AuditStatus::Success, None);
                Ok(())
            }
            Err(e) => {
                let err = SdkError::from(e);
                self.abort(&err);
                Err(err)
            }
        }
    }

    fn abort(mut self, err: &SdkError) {
        self.rollback();
        self.finalize(AuditStatus::Failed, Some(err.to_string()));
    }

    fn rollback(&self) {
        if let Err(e) = self.ctx.store().rollback() {
            error!("Rollback failed: {}", e);
        }
    }
}

impl Drop for AtomicOperation<'_> {
    fn drop(&mut self) {
        if self.log.is_some() {
            self.rollback();
            self.finalize(
                AuditStatus::Failed,
                Some("operation aborted before completion".to_string()),
            );
        }
    }
}

/// Runs `f` inside one transaction.
///
/// `Ok` commits; `Err` rolls back every write made through the operation and
/// is returned unchanged. Either way exactly one audit log is finalized,
/// including when the transaction cannot be opened.
pub fn with_atomic_operation<T, F>(ctx: &PluginContext, user: &Principal, f: F) -> SdkResult<T>
where
    F: FnOnce(&mut AtomicOperation<'_>) -> SdkResult<T>,
{
    run_atomic(ctx, user, |_| {}, f)
}

/// Like [`with_atomic_operation`], but `prepare` sees the operation before
/// the transaction is opened, so the log is described even if `begin` fails.
pub(crate) fn run_atomic<T, P, F>(ctx: &PluginContext, user: &Principal, prepare: P, f: F) -> SdkResult<T>
where
    P: FnOnce(&mut AtomicOperation<'_>),
    F: FnOnce(&mut AtomicOperation<'_>) -> SdkResult<T>,
{
    let mut op = AtomicOperation::open(ctx, user);
    prepare(&mut op);

    if let Err(e) = ctx.store().begin() {
        let err = SdkError::from(e);
        error!(user = %user.name, "Atomic operation could not start: {}", err);
        // Nothing was opened, so there is nothing to roll back.
        op.finalize(AuditStatus::Failed, Some(err.to_string()));
        return Err(err);
    }

    match f(&mut op) {
        Ok(value) => {
            op.complete()?;
            Ok(value)
        }
        Err(err) => {
            error!(user = %user.name, "Atomic operation failed, rolling back: {}", err);
            op.abort(&err);
            Err(err)
        }
    }
}
