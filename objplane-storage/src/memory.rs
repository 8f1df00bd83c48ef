//! In-memory record store with snapshot transactions.

use crate::error::{StorageError, StorageResult};
use crate::store::{RecordStore, Transactional};
use objplane_model::{Attrs, EntityKind, Entry};
use objplane_types::{EntryId, Principal};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    entities: BTreeMap<String, EntityKind>,
    next_entity_id: u64,
    entries: BTreeMap<EntryId, Entry>,
    next_entry_id: u64,
    /// State captured at `begin`, restored on `rollback`.
    snapshot: Option<(BTreeMap<EntryId, Entry>, u64)>,
    conflicts: HashSet<EntryId>,
}

impl Inner {
    fn check_conflict(&self, id: EntryId) -> StorageResult<()> {
        if self.conflicts.contains(&id) {
            return Err(StorageError::Conflict(id));
        }
        Ok(())
    }
}

/// Record store kept entirely in memory.
///
/// One unit of work may be open at a time; `begin` snapshots the entry table
/// and `rollback` restores it. Entity kinds are schema, not data, and are not
/// part of the snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Transaction("store lock poisoned".into()))
    }

    /// Declares an active entity kind with the given attribute names.
    pub fn register_entity(&self, name: &str, attributes: &[&str]) -> StorageResult<EntityKind> {
        let mut inner = self.lock()?;
        if inner.entities.contains_key(name) {
            return Err(StorageError::InvalidData(format!(
                "entity '{name}' already registered"
            )));
        }
        inner.next_entity_id += 1;
        let kind = attributes
            .iter()
            .fold(EntityKind::new(inner.next_entity_id, name), |kind, attr| {
                kind.with_attribute(*attr)
            });
        inner.entities.insert(name.to_string(), kind.clone());
        Ok(kind)
    }

    /// Marks an entity kind inactive; it stops resolving.
    pub fn deactivate_entity(&self, name: &str) -> StorageResult<()> {
        let mut inner = self.lock()?;
        let kind = inner
            .entities
            .get_mut(name)
            .ok_or_else(|| StorageError::EntityNotFound(name.to_string()))?;
        kind.is_active = false;
        Ok(())
    }

    /// Seeds an active entry with a fixed id, outside any transaction.
    pub fn insert_entry(
        &self,
        entity: &str,
        id: EntryId,
        name: &str,
        attrs: Attrs,
    ) -> StorageResult<Entry> {
        let mut inner = self.lock()?;
        if id.is_unsaved() || inner.entries.contains_key(&id) {
            return Err(StorageError::InvalidData(format!("entry id {id} unavailable")));
        }
        let kind = inner
            .entities
            .get(entity)
            .filter(|k| k.is_active)
            .cloned()
            .ok_or_else(|| StorageError::EntityNotFound(entity.to_string()))?;

        let now = now_millis();
        let entry = Entry {
            id,
            entity_id: kind.id,
            entity_name: kind.name,
            name: name.to_string(),
            attrs,
            is_active: true,
            created_by: 0,
            created_at: now,
            updated_at: now,
        };
        inner.next_entry_id = inner.next_entry_id.max(id.get());
        inner.entries.insert(id, entry.clone());
        Ok(entry)
    }

    /// Makes every subsequent write to `id` fail with `Conflict`.
    pub fn mark_conflict(&self, id: EntryId) -> StorageResult<()> {
        self.lock()?.conflicts.insert(id);
        Ok(())
    }

    /// Active entries of one entity kind, by id.
    pub fn active_entries(&self, entity: &str) -> StorageResult<Vec<Entry>> {
        Ok(self
            .lock()?
            .entries
            .values()
            .filter(|e| e.is_active && e.entity_name == entity)
            .cloned()
            .collect())
    }

    /// Number of stored entries, active or not.
    pub fn entry_count(&self) -> StorageResult<usize> {
        Ok(self.lock()?.entries.len())
    }

    pub fn in_transaction(&self) -> StorageResult<bool> {
        Ok(self.lock()?.snapshot.is_some())
    }
}

impl Transactional for MemoryStore {
    fn begin(&self) -> StorageResult<()> {
        let mut inner = self.lock()?;
        if inner.snapshot.is_some() {
            return Err(StorageError::Transaction("transaction already open".into()));
        }
        inner.snapshot = Some((inner.entries.clone(), inner.next_entry_id));
        debug!("Memory store transaction opened");
        Ok(())
    }

    fn commit(&self) -> StorageResult<()> {
        let mut inner = self.lock()?;
        if inner.snapshot.take().is_none() {
            return Err(StorageError::Transaction("commit without open transaction".into()));
        }
        debug!("Memory store transaction committed");
        Ok(())
    }

    fn rollback(&self) -> StorageResult<()> {
        let mut inner = self.lock()?;
        let (entries, next_entry_id) = inner
            .snapshot
            .take()
            .ok_or_else(|| StorageError::Transaction("rollback without open transaction".into()))?;
        inner.entries = entries;
        inner.next_entry_id = next_entry_id;
        debug!("Memory store transaction rolled back");
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn resolve_entity(&self, name: &str) -> StorageResult<Option<EntityKind>> {
        Ok(self
            .lock()?
            .entities
            .get(name)
            .filter(|k| k.is_active)
            .cloned())
    }

    fn get_entry(&self, id: EntryId) -> StorageResult<Option<Entry>> {
        Ok(self.lock()?.entries.get(&id).cloned())
    }

    fn filter_active(&self, ids: &[EntryId]) -> StorageResult<Vec<Entry>> {
        let inner = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.entries.get(id))
            .filter(|e| e.is_active)
            .cloned()
            .collect())
    }

    fn create_entry(
        &self,
        entity: &EntityKind,
        name: &str,
        owner: &Principal,
    ) -> StorageResult<Entry> {
        let mut inner = self.lock()?;
        if !inner
            .entities
            .get(&entity.name)
            .is_some_and(|k| k.is_active)
        {
            return Err(StorageError::EntityNotFound(entity.name.clone()));
        }
        inner.next_entry_id += 1;
        let now = now_millis();
        let entry = Entry {
            id: EntryId::new(inner.next_entry_id),
            entity_id: entity.id,
            entity_name: entity.name.clone(),
            name: name.to_string(),
            attrs: Attrs::new(),
            is_active: true,
            created_by: owner.id,
            created_at: now,
            updated_at: now,
        };
        inner.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn save_entry(&self, entry: &Entry) -> StorageResult<()> {
        let mut inner = self.lock()?;
        inner.check_conflict(entry.id)?;
        let stored = inner
            .entries
            .get_mut(&entry.id)
            .ok_or(StorageError::EntryNotFound(entry.id))?;
        stored.name = entry.name.clone();
        stored.attrs = entry.attrs.clone();
        stored.updated_at = now_millis();
        Ok(())
    }

    fn delete_entry(&self, id: EntryId, hard: bool) -> StorageResult<()> {
        let mut inner = self.lock()?;
        inner.check_conflict(id)?;
        if hard {
            inner
                .entries
                .remove(&id)
                .ok_or(StorageError::EntryNotFound(id))?;
        } else {
            let stored = inner
                .entries
                .get_mut(&id)
                .ok_or(StorageError::EntryNotFound(id))?;
            stored.is_active = false;
            stored.updated_at = now_millis();
        }
        Ok(())
    }

    fn get_attr(&self, id: EntryId, attribute: &str) -> StorageResult<Option<Value>> {
        let inner = self.lock()?;
        let entry = inner.entries.get(&id).ok_or(StorageError::EntryNotFound(id))?;
        Ok(entry.attrs.get(attribute).cloned())
    }

    fn set_attr(&self, id: EntryId, attribute: &str, value: Value) -> StorageResult<()> {
        let mut inner = self.lock()?;
        inner.check_conflict(id)?;
        let entity_name = inner
            .entries
            .get(&id)
            .map(|e| e.entity_name.clone())
            .ok_or(StorageError::EntryNotFound(id))?;
        let declared = inner
            .entities
            .get(&entity_name)
            .is_some_and(|k| k.has_attribute(attribute));
        if !declared {
            return Err(StorageError::AttributeNotFound {
                entity: entity_name,
                attribute: attribute.to_string(),
            });
        }
        if let Some(entry) = inner.entries.get_mut(&id) {
            entry.attrs.insert(attribute.to_string(), value);
            entry.updated_at = now_millis();
        }
        Ok(())
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
