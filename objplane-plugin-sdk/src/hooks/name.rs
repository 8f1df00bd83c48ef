use crate::error::{SdkError, SdkResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a hook's callbacks combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// Every callback sees the same payload; return values are ignored.
    Notify,
    /// Callbacks are chained; each one's return value feeds the next. A
    /// callback returning `None` passes the value through unchanged.
    Transform,
    /// Callbacks signal rejection by returning an error, never by value.
    Validate,
}

/// A dotted hook identifier, `<subject>.<event>`, e.g. `entry.after_create`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HookName {
    subject: String,
    event: String,
}

impl HookName {
    /// Parses `subject.event`. Both parts must be non-empty and made of
    /// lowercase ASCII letters, digits and underscores.
    pub fn parse(s: &str) -> SdkResult<Self> {
        let (subject, event) = s
            .split_once('.')
            .ok_or_else(|| SdkError::Validation(format!("hook '{s}' must be <subject>.<event>")))?;
        for part in [subject, event] {
            if !is_segment(part) {
                return Err(SdkError::Validation(format!(
                    "hook '{s}' has an invalid segment '{part}'"
                )));
            }
        }
        Ok(Self {
            subject: subject.to_string(),
            event: event.to_string(),
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn kind(&self) -> HookKind {
        if self.event.starts_with("before_") || self.event.starts_with("get_") {
            HookKind::Transform
        } else if self.event.starts_with("validate") {
            HookKind::Validate
        } else {
            HookKind::Notify
        }
    }
}

fn is_segment(part: &str) -> bool {
    !part.is_empty()
        && part
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.subject, self.event)
    }
}

impl FromStr for HookName {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HookName {
    type Error = SdkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HookName> for String {
    fn from(name: HookName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subject_and_event() {
        let hook = HookName::parse("entry.after_create").unwrap();
        assert_eq!(hook.subject(), "entry");
        assert_eq!(hook.event(), "after_create");
        assert_eq!(hook.to_string(), "entry.after_create");
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in ["", "entry", ".after", "entry.", "a.b.c", "Entry.after", "entry.after-create"] {
            assert!(HookName::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn kind_follows_event_prefix() {
        let kind = |s: &str| HookName::parse(s).unwrap().kind();
        assert_eq!(kind("entry.before_update"), HookKind::Transform);
        assert_eq!(kind("entity.get_attrs"), HookKind::Transform);
        assert_eq!(kind("entry.validate"), HookKind::Validate);
        assert_eq!(kind("entry.validate_name"), HookKind::Validate);
        assert_eq!(kind("entry.after_create"), HookKind::Notify);
    }

    #[test]
    fn serde_goes_through_parse() {
        let hook: HookName = serde_json::from_str("\"entry.after_delete\"").unwrap();
        assert_eq!(hook.event(), "after_delete");
        assert!(serde_json::from_str::<HookName>("\"nodot\"").is_err());
    }
}
