use crate::error::StorageResult;
use objplane_model::{EntityKind, Entry};
use objplane_types::{EntryId, Principal};
use serde_json::Value;

/// Begin/commit/rollback of one unit of work.
///
/// Writes made through the store between `begin` and `rollback` must not be
/// visible afterwards. Isolation between concurrent units of work is the
/// host's concern.
pub trait Transactional: Send + Sync {
    fn begin(&self) -> StorageResult<()>;
    fn commit(&self) -> StorageResult<()>;
    fn rollback(&self) -> StorageResult<()>;
}

/// Record access the engine needs from the host.
pub trait RecordStore: Transactional {
    /// Looks up an entity kind by name. Inactive kinds resolve to `None`.
    fn resolve_entity(&self, name: &str) -> StorageResult<Option<EntityKind>>;

    /// Fetches an entry by id, active or not.
    fn get_entry(&self, id: EntryId) -> StorageResult<Option<Entry>>;

    /// Active entries among `ids`, in the order of `ids`. Unknown and
    /// inactive ids are dropped.
    fn filter_active(&self, ids: &[EntryId]) -> StorageResult<Vec<Entry>>;

    /// Creates an empty active entry of `entity` owned by `owner`.
    fn create_entry(&self, entity: &EntityKind, name: &str, owner: &Principal)
        -> StorageResult<Entry>;

    /// Persists name and attributes of an existing entry.
    fn save_entry(&self, entry: &Entry) -> StorageResult<()>;

    /// Soft-deletes (clears the active flag) or removes an entry.
    fn delete_entry(&self, id: EntryId, hard: bool) -> StorageResult<()>;

    fn get_attr(&self, id: EntryId, attribute: &str) -> StorageResult<Option<Value>>;

    /// Sets one attribute; fails with `AttributeNotFound` when the entry's
    /// entity kind does not declare it.
    fn set_attr(&self, id: EntryId, attribute: &str, value: Value) -> StorageResult<()>;
}
