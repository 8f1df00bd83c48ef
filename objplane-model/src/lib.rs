//! Record model for objplane.
//!
//! Defines the types plugins and the engine exchange with the host:
//! - [`Entry`]: one record of an entity kind (id, name, JSON attributes)
//! - [`EntityKind`]: a named record collection and the attributes it declares
//! - [`EntryData`]: a name/attribute delta used for creates and updates
//! - [`EntityRelationship`] / [`RelationshipRegistry`]: typed, acyclic links
//!   between entity kinds declared by a plugin
//!
//! The host's concrete record type never crosses this boundary; stores
//! translate to and from these values.

mod entry;
mod error;
mod relationship;

pub use entry::{Attrs, EntityKind, Entry, EntryData};
pub use error::{ModelError, ModelResult};
pub use relationship::{EntityRelationship, RelationType, RelationshipRegistry};
