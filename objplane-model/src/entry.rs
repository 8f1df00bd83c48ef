use objplane_types::EntryId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute map of an entry: attribute name to JSON value.
pub type Attrs = Map<String, Value>;

/// A record stored by the host.
///
/// `attrs` holds arbitrary JSON whose shape is defined by the entity kind.
/// References to other entries are stored as an entry id or an array of ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub entity_id: u64,
    pub entity_name: String,
    pub name: String,
    #[serde(default)]
    pub attrs: Attrs,
    pub is_active: bool,
    pub created_by: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Entry {
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Extract a string attribute.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(|v| v.as_str())
    }

    /// Entry ids referenced by an attribute (single id or array of ids).
    pub fn referenced_ids(&self, name: &str) -> Vec<EntryId> {
        match self.attrs.get(name) {
            Some(Value::Array(items)) => items.iter().filter_map(EntryId::from_json).collect(),
            Some(value) => EntryId::from_json(value).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

/// A named collection of entries ("entity" in host terms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityKind {
    pub id: u64,
    pub name: String,
    pub is_active: bool,
    /// Attribute names declared by this kind.
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl EntityKind {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_active: true,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }
}

/// Name and attribute values to create an entry with, or to apply to one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attrs: Attrs,
}

impl EntryData {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            attrs: Attrs::new(),
        }
    }

    pub fn attrs_only(attrs: Attrs) -> Self {
        Self { name: None, attrs }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.attrs.is_empty()
    }

    /// Applies this delta to an entry in place. Returns true if anything changed.
    pub fn apply_to(&self, entry: &mut Entry) -> bool {
        let mut changed = false;
        if let Some(name) = &self.name {
            if entry.name != *name {
                entry.name = name.clone();
                changed = true;
            }
        }
        for (key, value) in &self.attrs {
            if entry.attrs.get(key) != Some(value) {
                entry.attrs.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }
}
