//! Property tests for the permission checker's partitioning.

mod common;

use common::Fixture;
use objplane_model::Entry;
use objplane_storage::MemoryAuthorizer;
use objplane_types::{AclType, EntryId};
use proptest::prelude::*;

fn arb_level() -> impl Strategy<Value = AclType> {
    prop_oneof![
        Just(AclType::Nothing),
        Just(AclType::Readable),
        Just(AclType::Writable),
        Just(AclType::Full),
    ]
}

proptest! {
    #[test]
    fn partitions_cover_every_entry_in_order(
        grants in prop::collection::vec(arb_level(), 0..24),
        required in arb_level(),
    ) {
        let mut authz = MemoryAuthorizer::deny_by_default();
        for (i, level) in grants.iter().enumerate() {
            authz.grant_entry(7, EntryId::new(i as u64 + 1), *level);
        }
        let fx = Fixture::new(authz);
        let entries: Vec<Entry> = (0..grants.len())
            .map(|i| fx.seed("Service", i as u64 + 1, &format!("svc{i}")))
            .collect();

        let result = fx.ctx.permission_checker(&fx.user).check_entries(&entries, required);

        prop_assert_eq!(result.granted.len() + result.denied.len(), result.checked_count);
        prop_assert_eq!(result.checked_count, entries.len());
        prop_assert_eq!(result.all_granted, result.denied.is_empty());

        for p in &result.granted {
            prop_assert!(grants[p.entry_id.get() as usize - 1].satisfies(required));
        }
        for p in &result.denied {
            prop_assert!(!grants[p.entry_id.get() as usize - 1].satisfies(required));
            prop_assert!(p.reason.is_some());
        }

        let denied_ids: Vec<u64> = result.denied.iter().map(|p| p.entry_id.get()).collect();
        let mut sorted = denied_ids.clone();
        sorted.sort_unstable();
        prop_assert_eq!(denied_ids, sorted);
    }

    #[test]
    fn check_entry_ids_skips_unknown_ids(extra in 100u64..200) {
        let fx = Fixture::new(MemoryAuthorizer::allow_all());
        fx.seed("Service", 1, "svc");

        let result = fx
            .ctx
            .permission_checker(&fx.user)
            .check_entry_ids(&[EntryId::new(1), EntryId::new(extra)], AclType::Full)
            .unwrap();

        prop_assert_eq!(result.checked_count, 1);
        prop_assert!(result.all_granted);
    }
}
