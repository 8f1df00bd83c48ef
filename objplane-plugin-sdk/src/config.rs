//! SDK configuration: reads `objplane.toml` and tunes audit, delete,
//! composite and hook behavior.

use crate::error::{SdkError, SdkResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "OBJPLANE_CONFIG";

/// Audit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// When false, logs are still finalized but not handed to the sink.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationsConfig {
    /// Delete entries permanently instead of clearing their active flag.
    #[serde(default)]
    pub hard_delete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeConfig {
    /// Reject related-data keys that match no relationship instead of
    /// skipping them.
    #[serde(default)]
    pub strict_related_keys: bool,
    /// Write the relationship attribute on the main entry after creation.
    #[serde(default = "default_true")]
    pub link_related: bool,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            strict_related_keys: false,
            link_related: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Dispatch `entry.after_*` hooks once an operation commits.
    #[serde(default = "default_true")]
    pub fire_after_commit: bool,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            fire_after_commit: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Full SDK configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub operations: OperationsConfig,
    #[serde(default)]
    pub composite: CompositeConfig,
    #[serde(default)]
    pub hooks: HooksConfig,
}

impl SdkConfig {
    /// Loads from `$OBJPLANE_CONFIG`, else `./objplane.toml`.
    /// Falls back to defaults with a warning on read or parse errors.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("objplane.toml"));
        Self::load_from(&path)
    }

    /// Loads from an explicit path, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No SDK config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded SDK config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse SDK config {:?}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read SDK config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Parses a TOML document; unlike `load_from` this reports errors.
    pub fn from_toml_str(contents: &str) -> SdkResult<Self> {
        toml::from_str(contents).map_err(|e| SdkError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SdkConfig::default();
        assert!(config.audit.enabled);
        assert!(!config.operations.hard_delete);
        assert!(!config.composite.strict_related_keys);
        assert!(config.composite.link_related);
        assert!(config.hooks.fire_after_commit);
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = SdkConfig::from_toml_str(
            r#"
            [composite]
            strict_related_keys = true
            "#,
        )
        .unwrap();
        assert!(config.composite.strict_related_keys);
        assert!(config.composite.link_related);
        assert!(config.audit.enabled);
    }

    #[test]
    fn invalid_document_is_an_error() {
        assert!(matches!(
            SdkConfig::from_toml_str("[audit]\nenabled = \"yes\""),
            Err(SdkError::Config(_))
        ));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = SdkConfig::load_from(Path::new("/nonexistent/objplane.toml"));
        assert_eq!(config, SdkConfig::default());
    }
}
