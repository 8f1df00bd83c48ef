//! Authorization capability and a table-driven reference implementation.

use objplane_model::{EntityKind, Entry};
use objplane_types::{AclType, EntryId, Principal};
use std::collections::{HashMap, HashSet};

/// Answers whether a principal holds a required level on a record or kind.
pub trait Authorizer: Send + Sync {
    fn may_access_entry(&self, principal: &Principal, entry: &Entry, required: AclType) -> bool;

    fn may_access_entity(
        &self,
        principal: &Principal,
        entity: &EntityKind,
        required: AclType,
    ) -> bool;
}

/// Grants looked up from in-memory tables.
///
/// Resolution order for an entry: superuser, explicit entry grant, grant on
/// the entry's entity kind, default level. Entity kinds resolve the same way
/// minus the entry step.
#[derive(Debug, Clone)]
pub struct MemoryAuthorizer {
    default_level: AclType,
    superusers: HashSet<u64>,
    entry_grants: HashMap<(u64, EntryId), AclType>,
    entity_grants: HashMap<(u64, String), AclType>,
}

impl MemoryAuthorizer {
    /// Nobody holds anything unless granted.
    pub fn deny_by_default() -> Self {
        Self::with_default(AclType::Nothing)
    }

    /// Everybody holds `Full` unless a narrower grant says otherwise.
    pub fn allow_all() -> Self {
        Self::with_default(AclType::Full)
    }

    pub fn with_default(default_level: AclType) -> Self {
        Self {
            default_level,
            superusers: HashSet::new(),
            entry_grants: HashMap::new(),
            entity_grants: HashMap::new(),
        }
    }

    pub fn grant_superuser(&mut self, principal_id: u64) -> &mut Self {
        self.superusers.insert(principal_id);
        self
    }

    pub fn grant_entry(&mut self, principal_id: u64, entry: EntryId, level: AclType) -> &mut Self {
        self.entry_grants.insert((principal_id, entry), level);
        self
    }

    pub fn grant_entity(
        &mut self,
        principal_id: u64,
        entity: impl Into<String>,
        level: AclType,
    ) -> &mut Self {
        self.entity_grants.insert((principal_id, entity.into()), level);
        self
    }

    /// Effective level of `principal` on `entry`.
    pub fn entry_level(&self, principal: &Principal, entry: &Entry) -> AclType {
        if self.superusers.contains(&principal.id) {
            return AclType::Full;
        }
        self.entry_grants
            .get(&(principal.id, entry.id))
            .copied()
            .unwrap_or_else(|| self.entity_level_by_name(principal.id, &entry.entity_name))
    }

    fn entity_level_by_name(&self, principal_id: u64, entity: &str) -> AclType {
        if self.superusers.contains(&principal_id) {
            return AclType::Full;
        }
        self.entity_grants
            .get(&(principal_id, entity.to_string()))
            .copied()
            .unwrap_or(self.default_level)
    }
}

impl Default for MemoryAuthorizer {
    fn default() -> Self {
        Self::deny_by_default()
    }
}

impl Authorizer for MemoryAuthorizer {
    fn may_access_entry(&self, principal: &Principal, entry: &Entry, required: AclType) -> bool {
        self.entry_level(principal, entry).satisfies(required)
    }

    fn may_access_entity(
        &self,
        principal: &Principal,
        entity: &EntityKind,
        required: AclType,
    ) -> bool {
        self.entity_level_by_name(principal.id, &entity.name)
            .satisfies(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objplane_model::Attrs;

    fn entry(id: u64, entity: &str) -> Entry {
        Entry {
            id: EntryId::new(id),
            entity_id: 1,
            entity_name: entity.into(),
            name: format!("e{id}"),
            attrs: Attrs::new(),
            is_active: true,
            created_by: 1,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn entry_grant_overrides_entity_grant() {
        let user = Principal::new(7, "bob");
        let mut authz = MemoryAuthorizer::deny_by_default();
        authz
            .grant_entity(7, "Service", AclType::Full)
            .grant_entry(7, EntryId::new(42), AclType::Readable);

        assert!(!authz.may_access_entry(&user, &entry(42, "Service"), AclType::Writable));
        assert!(authz.may_access_entry(&user, &entry(43, "Service"), AclType::Full));
    }

    #[test]
    fn superuser_holds_full() {
        let root = Principal::new(1, "root");
        let mut authz = MemoryAuthorizer::deny_by_default();
        authz.grant_superuser(1);
        assert!(authz.may_access_entry(&root, &entry(5, "Host"), AclType::Full));
        assert!(authz.may_access_entity(&root, &EntityKind::new(1, "Host"), AclType::Full));
    }

    #[test]
    fn default_level_applies() {
        let user = Principal::new(2, "carol");
        let authz = MemoryAuthorizer::with_default(AclType::Readable);
        assert!(authz.may_access_entry(&user, &entry(1, "Host"), AclType::Readable));
        assert!(!authz.may_access_entity(&user, &EntityKind::new(1, "Host"), AclType::Writable));
    }
}
