use objplane_types::{AclType, EntryId, OperationId, Principal};
use proptest::prelude::*;
use std::collections::HashSet;
use std::str::FromStr;

// ── EntryId ───────────────────────────────────────────────────────

#[test]
fn entry_id_unsaved_is_zero() {
    assert_eq!(EntryId::UNSAVED.get(), 0);
    assert!(EntryId::UNSAVED.is_unsaved());
    assert!(!EntryId::new(42).is_unsaved());
}

#[test]
fn entry_id_display_and_parse() {
    let id = EntryId::new(42);
    assert_eq!(id.to_string(), "42");
    assert_eq!(EntryId::from_str("42").unwrap(), id);
    assert_eq!(EntryId::from_str(" 7 ").unwrap(), EntryId::new(7));
}

#[test]
fn entry_id_parse_invalid() {
    assert!(EntryId::from_str("forty-two").is_err());
    assert!(EntryId::from_str("-1").is_err());
}

#[test]
fn entry_id_from_json() {
    assert_eq!(
        EntryId::from_json(&serde_json::json!(12)),
        Some(EntryId::new(12))
    );
    assert_eq!(EntryId::from_json(&serde_json::json!("12")), None);
    assert_eq!(EntryId::from_json(&serde_json::json!(-3)), None);
}

#[test]
fn entry_id_serializes_transparently() {
    let json = serde_json::to_string(&EntryId::new(9)).unwrap();
    assert_eq!(json, "9");
}

#[test]
fn entry_id_hash_and_eq() {
    let mut set = HashSet::new();
    set.insert(EntryId::new(1));
    set.insert(EntryId::new(1));
    set.insert(EntryId::new(2));
    assert_eq!(set.len(), 2);
}

// ── OperationId ───────────────────────────────────────────────────

#[test]
fn operation_id_new_is_unique() {
    assert_ne!(OperationId::new(), OperationId::new());
}

#[test]
fn operation_id_display_and_parse() {
    let id = OperationId::new();
    let parsed: OperationId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn operation_id_parse_invalid() {
    let err = OperationId::from_str("not-a-uuid").unwrap_err();
    assert!(matches!(err, objplane_types::Error::InvalidOperationId(_)));
}

// ── AclType / Principal ───────────────────────────────────────────

#[test]
fn acl_serializes_lowercase() {
    let json = serde_json::to_string(&AclType::Writable).unwrap();
    assert_eq!(json, "\"writable\"");
}

#[test]
fn principal_new() {
    let user = Principal::new(3, "alice");
    assert_eq!(user.id, 3);
    assert_eq!(user.name, "alice");
}

proptest! {
    #[test]
    fn entry_id_string_roundtrip(raw in any::<u64>()) {
        let id = EntryId::new(raw);
        prop_assert_eq!(EntryId::from_str(&id.to_string()).unwrap(), id);
    }
}
