//! Batched permission checks over entries and entity kinds.
//!
//! Every record in a batch is evaluated, so a caller gets the full list of
//! what blocked an operation rather than the first refusal. Results keep
//! input order.

use crate::error::SdkResult;
use objplane_model::Entry;
use objplane_storage::{Authorizer, RecordStore};
use objplane_types::{AclType, EntryId, Principal};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Outcome of one permission evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPermission {
    /// `EntryId::UNSAVED` for entity-kind create checks.
    pub entry_id: EntryId,
    pub entity_name: String,
    pub entry_name: String,
    pub required_permission: AclType,
    pub granted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Granted and denied partitions of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheckResult {
    pub all_granted: bool,
    pub checked_count: usize,
    pub granted: Vec<EntryPermission>,
    pub denied: Vec<EntryPermission>,
}

impl PermissionCheckResult {
    /// Partitions evaluations, preserving their order within each side.
    pub fn from_evaluations(evaluations: Vec<EntryPermission>) -> Self {
        let checked_count = evaluations.len();
        let (granted, denied): (Vec<_>, Vec<_>) =
            evaluations.into_iter().partition(|p| p.granted);
        Self {
            all_granted: denied.is_empty(),
            checked_count,
            granted,
            denied,
        }
    }

    /// Concatenates two results, `self` first.
    #[must_use]
    pub fn merge(mut self, other: PermissionCheckResult) -> Self {
        self.checked_count += other.checked_count;
        self.granted.extend(other.granted);
        self.denied.extend(other.denied);
        self.all_granted = self.denied.is_empty();
        self
    }
}

/// Evaluates permissions for one principal.
pub struct PermissionChecker<'a> {
    store: &'a dyn RecordStore,
    authorizer: &'a dyn Authorizer,
    user: &'a Principal,
}

impl<'a> PermissionChecker<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        authorizer: &'a dyn Authorizer,
        user: &'a Principal,
    ) -> Self {
        Self {
            store,
            authorizer,
            user,
        }
    }

    /// Evaluates a single entry.
    pub fn evaluate_entry(&self, entry: &Entry, required: AclType) -> EntryPermission {
        let granted = self.authorizer.may_access_entry(self.user, entry, required);
        EntryPermission {
            entry_id: entry.id,
            entity_name: entry.entity_name.clone(),
            entry_name: entry.name.clone(),
            required_permission: required,
            granted,
            reason: (!granted).then(|| {
                format!("user '{}' lacks {} access to entry {}", self.user.name, required, entry.id)
            }),
        }
    }

    /// Evaluates every entry independently.
    pub fn check_entries(&self, entries: &[Entry], required: AclType) -> PermissionCheckResult {
        let result = PermissionCheckResult::from_evaluations(
            entries
                .iter()
                .map(|entry| self.evaluate_entry(entry, required))
                .collect(),
        );
        self.trace("entries", required, &result);
        result
    }

    /// Resolves `ids` to active entries, then checks them. Ids that do not
    /// resolve are not part of the result.
    pub fn check_entry_ids(
        &self,
        ids: &[EntryId],
        required: AclType,
    ) -> SdkResult<PermissionCheckResult> {
        let entries = self.store.filter_active(ids)?;
        Ok(self.check_entries(&entries, required))
    }

    /// Checks that the user may create entries of each named kind. Kinds
    /// that do not resolve are denied with a reason, never an error.
    pub fn check_entity_create_permission<S: AsRef<str>>(
        &self,
        entity_names: &[S],
    ) -> SdkResult<PermissionCheckResult> {
        let required = AclType::Writable;
        let mut evaluations = Vec::with_capacity(entity_names.len());

        for name in entity_names {
            let name = name.as_ref();
            let evaluation = match self.store.resolve_entity(name)? {
                Some(kind) => {
                    let granted = self.authorizer.may_access_entity(self.user, &kind, required);
                    EntryPermission {
                        entry_id: EntryId::UNSAVED,
                        entity_name: kind.name.clone(),
                        entry_name: String::new(),
                        required_permission: required,
                        granted,
                        reason: (!granted).then(|| {
                            format!("user '{}' may not create entries of '{}'", self.user.name, name)
                        }),
                    }
                }
                None => EntryPermission {
                    entry_id: EntryId::UNSAVED,
                    entity_name: name.to_string(),
                    entry_name: String::new(),
                    required_permission: required,
                    granted: false,
                    reason: Some(format!("entity '{name}' not found or inactive")),
                },
            };
            evaluations.push(evaluation);
        }

        let result = PermissionCheckResult::from_evaluations(evaluations);
        self.trace("entity-create", required, &result);
        Ok(result)
    }

    fn trace(&self, scope: &str, required: AclType, result: &PermissionCheckResult) {
        debug!(
            user = %self.user.name,
            scope,
            required = %required,
            checked = result.checked_count,
            denied = result.denied.len(),
            "Permission check"
        );
        if !result.all_granted {
            warn!(
                user = %self.user.name,
                scope,
                denied = result.denied.len(),
                "Permission check denied"
            );
        }
    }
}
