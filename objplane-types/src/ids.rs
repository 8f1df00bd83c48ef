//! Identifier types used throughout objplane.
//!
//! Entries are addressed by the host's numeric primary key. Operation logs use
//! UUID v7 so they sort by creation time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of an entry (record) in the host's record store.
///
/// `EntryId::UNSAVED` (0) marks an entry that has not been created yet,
/// e.g. the target of a planned create in a permission report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    /// Placeholder id for entries that do not exist yet.
    pub const UNSAVED: EntryId = EntryId(0);

    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_unsaved(&self) -> bool {
        self.0 == 0
    }

    /// Reads an id out of a JSON attribute value (a non-negative integer).
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        value.as_u64().map(Self)
    }
}

impl From<u64> for EntryId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| crate::Error::InvalidEntryId(s.to_string()))
    }
}

/// Id of one audit log. UUID v7, so ids order by start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(Uuid);

impl OperationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OperationId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}
