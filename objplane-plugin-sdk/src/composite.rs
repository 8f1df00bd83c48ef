//! Composite creation: a main entry plus related entries, created together
//! in one cross-entity operation.

use crate::context::PluginContext;
use crate::error::{SdkError, SdkResult};
use crate::operation::CrossEntityOperation;
use objplane_model::{EntityRelationship, Entry, EntryData};
use objplane_types::Principal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Related data keyed by relationship attribute name.
pub type RelatedData = BTreeMap<String, Vec<EntryData>>;

/// A main entry and the related entries created with it, grouped by
/// relationship attribute name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeEntry {
    pub main_entry: Entry,
    pub related_entries: BTreeMap<String, Vec<Entry>>,
}

impl CompositeEntry {
    pub fn related(&self, attribute: &str) -> &[Entry] {
        self.related_entries
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Creates `main_data` as an entry of `main_entity` and, for each key of
/// `related_data` naming a relationship's attribute, one entry of that
/// relationship's target kind per item.
///
/// Keys that match no relationship are skipped with a warning, or rejected
/// before anything runs when `composite.strict_related_keys` is set. When
/// `composite.link_related` is set the main entry's relationship attribute
/// is pointed at the created children in the same transaction.
pub fn create_composite(
    ctx: &PluginContext,
    user: &Principal,
    main_entity: &str,
    main_data: EntryData,
    related_data: &RelatedData,
    relationships: &[EntityRelationship],
    plugin_id: &str,
) -> SdkResult<CompositeEntry> {
    let config = &ctx.config().composite;
    let mut op = CrossEntityOperation::new(ctx, user, plugin_id);
    op.add_create(main_entity, main_data)?;

    let mut groups: Vec<(String, usize)> = Vec::new();
    for (attribute, items) in related_data {
        let Some(rel) = relationships
            .iter()
            .find(|r| r.attribute_name() == attribute)
        else {
            if config.strict_related_keys {
                return Err(SdkError::Validation(format!(
                    "no relationship declares attribute '{attribute}'"
                )));
            }
            warn!(
                plugin_id,
                entity = %main_entity,
                attribute = %attribute,
                skipped = items.len(),
                "Related data has no matching relationship, skipping"
            );
            continue;
        };

        for item in items {
            op.add_create(rel.target_entity(), item.clone())?;
        }
        groups.push((attribute.clone(), items.len()));
    }

    if config.link_related {
        let mut next = 1;
        for (attribute, count) in &groups {
            if *count > 0 {
                op.link_results(0, (next..next + count).collect(), attribute.clone());
            }
            next += count;
        }
    }

    let result = op.execute()?;
    if !result.success {
        return Err(SdkError::Operation(
            result
                .error
                .unwrap_or_else(|| "composite creation failed".to_string()),
        ));
    }

    let mut produced = result.entries.into_iter();
    let main_entry = produced
        .next()
        .ok_or_else(|| SdkError::Operation("composite produced no main entry".to_string()))?;

    let mut related_entries = BTreeMap::new();
    for (attribute, count) in groups {
        related_entries.insert(attribute, produced.by_ref().take(count).collect());
    }

    debug!(
        plugin_id,
        entity = %main_entity,
        main_entry = %main_entry.id,
        groups = related_entries.len(),
        "Composite entry created"
    );
    Ok(CompositeEntry {
        main_entry,
        related_entries,
    })
}
