//! Typed relationships between entity kinds.
//!
//! A plugin declares how its entity kinds refer to each other; the registry
//! keeps those declarations acyclic so cascade walks always terminate.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// How the target side of a relationship relates to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// Targets are owned by the source and share its lifecycle.
    Composition,
    /// Weak link; no ownership or cascade implied.
    Reference,
    /// Peer association between independent records.
    Association,
}

/// A directed relationship `source_entity -> target_entity` through
/// `attribute_name` on the source.
///
/// Deserialization goes through [`EntityRelationship::new`], so a malformed
/// declaration is rejected however it arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RelationshipDecl")]
pub struct EntityRelationship {
    source_entity: String,
    target_entity: String,
    relation_type: RelationType,
    attribute_name: String,
    cascade_delete: bool,
    required: bool,
}

#[derive(Deserialize)]
struct RelationshipDecl {
    source_entity: String,
    target_entity: String,
    relation_type: RelationType,
    attribute_name: String,
    #[serde(default)]
    cascade_delete: bool,
    #[serde(default)]
    required: bool,
}

impl TryFrom<RelationshipDecl> for EntityRelationship {
    type Error = ModelError;

    fn try_from(decl: RelationshipDecl) -> Result<Self, Self::Error> {
        Ok(Self::new(
            decl.source_entity,
            decl.target_entity,
            decl.relation_type,
            decl.attribute_name,
        )?
        .with_cascade_delete(decl.cascade_delete)
        .with_required(decl.required))
    }
}

impl EntityRelationship {
    /// Validates and builds a relationship. Names must be non-empty and the
    /// source and target must differ.
    pub fn new(
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
        relation_type: RelationType,
        attribute_name: impl Into<String>,
    ) -> ModelResult<Self> {
        let source_entity = source_entity.into();
        let target_entity = target_entity.into();
        let attribute_name = attribute_name.into();

        if source_entity.trim().is_empty() {
            return Err(ModelError::Validation("source entity must not be empty".into()));
        }
        if target_entity.trim().is_empty() {
            return Err(ModelError::Validation("target entity must not be empty".into()));
        }
        if attribute_name.trim().is_empty() {
            return Err(ModelError::Validation("attribute name must not be empty".into()));
        }
        if source_entity == target_entity {
            return Err(ModelError::Validation(format!(
                "entity '{source_entity}' cannot relate to itself"
            )));
        }

        Ok(Self {
            source_entity,
            target_entity,
            relation_type,
            attribute_name,
            cascade_delete: false,
            required: false,
        })
    }

    /// Shorthand for a composition; compositions cascade deletes.
    pub fn composition(
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
        attribute_name: impl Into<String>,
    ) -> ModelResult<Self> {
        Ok(Self::new(source_entity, target_entity, RelationType::Composition, attribute_name)?
            .with_cascade_delete(true))
    }

    pub fn reference(
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
        attribute_name: impl Into<String>,
    ) -> ModelResult<Self> {
        Self::new(source_entity, target_entity, RelationType::Reference, attribute_name)
    }

    pub fn association(
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
        attribute_name: impl Into<String>,
    ) -> ModelResult<Self> {
        Self::new(source_entity, target_entity, RelationType::Association, attribute_name)
    }

    #[must_use]
    pub fn with_cascade_delete(mut self, cascade_delete: bool) -> Self {
        self.cascade_delete = cascade_delete;
        self
    }

    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn source_entity(&self) -> &str {
        &self.source_entity
    }

    pub fn target_entity(&self) -> &str {
        &self.target_entity
    }

    pub fn relation_type(&self) -> RelationType {
        self.relation_type
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    pub fn cascade_delete(&self) -> bool {
        self.cascade_delete
    }

    pub fn required(&self) -> bool {
        self.required
    }
}

/// Ordered set of relationships for one plugin context. Always a DAG.
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    relationships: Vec<EntityRelationship>,
}

impl RelationshipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a relationship unless it would close a cycle, in which case
    /// the registry is left unchanged.
    pub fn register(&mut self, relationship: EntityRelationship) -> ModelResult<()> {
        if self.reaches(relationship.target_entity(), relationship.source_entity()) {
            return Err(ModelError::CircularReference {
                source_entity: relationship.source_entity.clone(),
                target_entity: relationship.target_entity.clone(),
            });
        }
        debug!(
            source = %relationship.source_entity,
            target = %relationship.target_entity,
            attribute = %relationship.attribute_name,
            "Registered entity relationship"
        );
        self.relationships.push(relationship);
        Ok(())
    }

    /// Relationships whose source is `entity`, in registration order.
    pub fn relationships_for_entity(&self, entity: &str) -> Vec<&EntityRelationship> {
        self.relationships
            .iter()
            .filter(|r| r.source_entity == entity)
            .collect()
    }

    pub fn cascade_delete_targets(&self, entity: &str) -> Vec<&EntityRelationship> {
        self.relationships
            .iter()
            .filter(|r| r.source_entity == entity && r.cascade_delete)
            .collect()
    }

    pub fn target_entities(&self, entity: &str) -> Vec<&str> {
        self.relationships
            .iter()
            .filter(|r| r.source_entity == entity)
            .map(|r| r.target_entity.as_str())
            .collect()
    }

    /// The relationship leaving `source` through `attribute`, if declared.
    pub fn find_by_attribute(&self, source: &str, attribute: &str) -> Option<&EntityRelationship> {
        self.relationships
            .iter()
            .find(|r| r.source_entity == source && r.attribute_name == attribute)
    }

    pub fn all(&self) -> &[EntityRelationship] {
        &self.relationships
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    /// Depth-first search along target edges from `from`, looking for `goal`.
    fn reaches(&self, from: &str, goal: &str) -> bool {
        let mut stack = vec![from];
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(current) = stack.pop() {
            if current == goal {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.extend(
                self.relationships
                    .iter()
                    .filter(|r| r.source_entity == current)
                    .map(|r| r.target_entity.as_str()),
            );
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_self_relationships() {
        assert!(matches!(
            EntityRelationship::reference("", "B", "b"),
            Err(ModelError::Validation(_))
        ));
        assert!(matches!(
            EntityRelationship::reference("A", "B", " "),
            Err(ModelError::Validation(_))
        ));
        assert!(matches!(
            EntityRelationship::reference("A", "A", "a"),
            Err(ModelError::Validation(_))
        ));
    }

    #[test]
    fn composition_cascades_by_default() {
        let rel = EntityRelationship::composition("A", "B", "bs").unwrap();
        assert!(rel.cascade_delete());
        assert_eq!(rel.relation_type(), RelationType::Composition);
    }

    #[test]
    fn transitive_cycle_is_rejected() {
        let mut registry = RelationshipRegistry::new();
        registry.register(EntityRelationship::reference("A", "B", "b").unwrap()).unwrap();
        registry.register(EntityRelationship::reference("B", "C", "c").unwrap()).unwrap();

        let err = registry
            .register(EntityRelationship::reference("C", "A", "a").unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::CircularReference {
                source_entity: "C".into(),
                target_entity: "A".into(),
            }
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn diamond_is_allowed() {
        let mut registry = RelationshipRegistry::new();
        registry.register(EntityRelationship::reference("A", "B", "b").unwrap()).unwrap();
        registry.register(EntityRelationship::reference("A", "C", "c").unwrap()).unwrap();
        registry.register(EntityRelationship::reference("B", "D", "d").unwrap()).unwrap();
        registry.register(EntityRelationship::reference("C", "D", "d").unwrap()).unwrap();
        assert_eq!(registry.len(), 4);
    }
}
