//! ACL levels.
//!
//! Levels are ordered `Nothing < Readable < Writable < Full` and carry the
//! host's bitmask values. A check always names the exact level it requires;
//! whether a grant of one level satisfies another is the authorizer's call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access level required by, or granted for, a record or entity kind.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AclType {
    #[default]
    Nothing,
    Readable,
    Writable,
    Full,
}

impl AclType {
    /// All levels in ascending order.
    pub const ALL: [AclType; 4] = [
        AclType::Nothing,
        AclType::Readable,
        AclType::Writable,
        AclType::Full,
    ];

    /// Host bitmask value of this level.
    pub const fn bits(&self) -> u8 {
        match self {
            Self::Nothing => 1,
            Self::Readable => 2,
            Self::Writable => 4,
            Self::Full => 8,
        }
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.bits() == bits)
    }

    /// True when a grant of `self` meets a requirement of `required`.
    pub fn satisfies(&self, required: AclType) -> bool {
        *self >= required
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Nothing => "nothing",
            Self::Readable => "readable",
            Self::Writable => "writable",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for AclType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AclType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nothing" => Ok(Self::Nothing),
            "readable" => Ok(Self::Readable),
            "writable" => Ok(Self::Writable),
            "full" => Ok(Self::Full),
            _ => Err(crate::Error::InvalidAclLevel(s.to_string())),
        }
    }
}
