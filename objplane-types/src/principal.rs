use serde::{Deserialize, Serialize};

/// The acting user of an operation.
///
/// Only an id and a display name are needed by the engine; authentication
/// and sessions stay with the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub id: u64,
    pub name: String,
}

impl Principal {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
