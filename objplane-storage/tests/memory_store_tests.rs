use objplane_model::Attrs;
use objplane_storage::{MemoryStore, RecordStore, StorageError, Transactional};
use objplane_types::{EntryId, Principal};
use pretty_assertions::assert_eq;
use serde_json::json;

fn store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .register_entity("Service", &["configurations", "port"])
        .unwrap();
    store.register_entity("Configuration", &[]).unwrap();
    store
}

fn alice() -> Principal {
    Principal::new(1, "alice")
}

// ── Entity kinds ─────────────────────────────────────────────────

#[test]
fn resolve_entity_skips_inactive() {
    let store = store();
    assert!(store.resolve_entity("Service").unwrap().is_some());
    store.deactivate_entity("Service").unwrap();
    assert!(store.resolve_entity("Service").unwrap().is_none());
    assert!(store.resolve_entity("Nope").unwrap().is_none());
}

#[test]
fn registered_kind_declares_its_attributes() {
    let store = store();
    let kind = store.resolve_entity("Service").unwrap().unwrap();
    assert_eq!(kind.attributes, vec!["configurations".to_string(), "port".to_string()]);
    assert!(kind.has_attribute("port"));
    assert!(!kind.has_attribute("owner"));
}

#[test]
fn duplicate_entity_rejected() {
    let store = store();
    assert!(matches!(
        store.register_entity("Service", &[]),
        Err(StorageError::InvalidData(_))
    ));
}

// ── Entries ──────────────────────────────────────────────────────

#[test]
fn create_assigns_owner_and_id() {
    let store = store();
    let kind = store.resolve_entity("Service").unwrap().unwrap();
    let entry = store.create_entry(&kind, "svc1", &alice()).unwrap();
    assert_eq!(entry.created_by, 1);
    assert_eq!(entry.entity_name, "Service");
    assert!(!entry.id.is_unsaved());
    assert!(entry.is_active);
}

#[test]
fn seeded_ids_are_not_reused() {
    let store = store();
    store
        .insert_entry("Service", EntryId::new(42), "seed", Attrs::new())
        .unwrap();
    let kind = store.resolve_entity("Service").unwrap().unwrap();
    let next = store.create_entry(&kind, "svc", &alice()).unwrap();
    assert_eq!(next.id, EntryId::new(43));
}

#[test]
fn filter_active_keeps_input_order() {
    let store = store();
    for id in [3, 1, 2] {
        store
            .insert_entry("Service", EntryId::new(id), &format!("s{id}"), Attrs::new())
            .unwrap();
    }
    store.delete_entry(EntryId::new(1), false).unwrap();

    let ids: Vec<u64> = store
        .filter_active(&[EntryId::new(2), EntryId::new(1), EntryId::new(3), EntryId::new(9)])
        .unwrap()
        .iter()
        .map(|e| e.id.get())
        .collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn soft_and_hard_delete() {
    let store = store();
    store
        .insert_entry("Service", EntryId::new(1), "a", Attrs::new())
        .unwrap();
    store
        .insert_entry("Service", EntryId::new(2), "b", Attrs::new())
        .unwrap();

    store.delete_entry(EntryId::new(1), false).unwrap();
    store.delete_entry(EntryId::new(2), true).unwrap();

    assert!(!store.get_entry(EntryId::new(1)).unwrap().unwrap().is_active);
    assert!(store.get_entry(EntryId::new(2)).unwrap().is_none());
    assert!(matches!(
        store.delete_entry(EntryId::new(2), true),
        Err(StorageError::EntryNotFound(_))
    ));
}

#[test]
fn set_attr_requires_declared_attribute() {
    let store = store();
    store
        .insert_entry("Service", EntryId::new(1), "a", Attrs::new())
        .unwrap();

    store.set_attr(EntryId::new(1), "port", json!(8080)).unwrap();
    assert_eq!(
        store.get_attr(EntryId::new(1), "port").unwrap(),
        Some(json!(8080))
    );

    assert!(matches!(
        store.set_attr(EntryId::new(1), "color", json!("red")),
        Err(StorageError::AttributeNotFound { .. })
    ));
}

#[test]
fn conflicted_entry_rejects_writes() {
    let store = store();
    let entry = store
        .insert_entry("Service", EntryId::new(1), "a", Attrs::new())
        .unwrap();
    store.mark_conflict(entry.id).unwrap();
    assert!(matches!(
        store.save_entry(&entry),
        Err(StorageError::Conflict(_))
    ));
}

// ── Transactions ─────────────────────────────────────────────────

#[test]
fn rollback_discards_writes() {
    let store = store();
    let kind = store.resolve_entity("Service").unwrap().unwrap();

    store.begin().unwrap();
    store.create_entry(&kind, "temp", &alice()).unwrap();
    assert_eq!(store.entry_count().unwrap(), 1);
    store.rollback().unwrap();

    assert_eq!(store.entry_count().unwrap(), 0);
    assert!(!store.in_transaction().unwrap());
}

#[test]
fn commit_keeps_writes() {
    let store = store();
    let kind = store.resolve_entity("Service").unwrap().unwrap();

    store.begin().unwrap();
    store.create_entry(&kind, "kept", &alice()).unwrap();
    store.commit().unwrap();

    assert_eq!(store.active_entries("Service").unwrap().len(), 1);
}

#[test]
fn nested_begin_and_stray_commit_fail() {
    let store = store();
    store.begin().unwrap();
    assert!(matches!(store.begin(), Err(StorageError::Transaction(_))));
    store.commit().unwrap();
    assert!(matches!(store.commit(), Err(StorageError::Transaction(_))));
    assert!(matches!(store.rollback(), Err(StorageError::Transaction(_))));
}
