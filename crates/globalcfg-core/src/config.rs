//! Node configuration.
//!
//! The node itself has almost no tunables: everything it reconciles comes from
//! the stores. What it does need is the identity of the running control-plane
//! build, which feeds the internal version signature recorded in the intent
//! store.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level node configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Build identity used for the internal version signature.
    #[serde(default)]
    pub version: VersionConfig,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a version component is
    /// empty.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.version.package.trim().is_empty() {
            return Err(ConfigError::Validation(
                "version.package must not be empty".to_string(),
            ));
        }
        if self.version.schema.trim().is_empty() {
            return Err(ConfigError::Validation(
                "version.schema must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Identity of the running control-plane build.
///
/// Worker nodes compare the signature built from these fields against their
/// own to decide whether they can safely consume published state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionConfig {
    /// Package version of the control plane.
    #[serde(default = "default_package_version")]
    pub package: String,

    /// State store schema version.
    #[serde(default = "default_schema_version")]
    pub schema: String,

    /// Number of flow actions the build understands.
    #[serde(default = "default_action_count")]
    pub actions: u32,

    /// Internal minor revision, bumped on compatible behaviour changes.
    #[serde(default = "default_minor_version")]
    pub minor: u32,
}

impl VersionConfig {
    /// Formats the internal version signature.
    #[must_use]
    pub fn signature(&self) -> String {
        format!(
            "{}-{}-{}.{}",
            self.package, self.schema, self.actions, self.minor
        )
    }
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            package: default_package_version(),
            schema: default_schema_version(),
            actions: default_action_count(),
            minor: default_minor_version(),
        }
    }
}

fn default_package_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_schema_version() -> String {
    "20.37.0".to_string()
}

const fn default_action_count() -> u32 {
    98
}

const fn default_minor_version() -> u32 {
    5
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = NodeConfig::from_toml("").unwrap();
        assert_eq!(config, NodeConfig::default());
        assert_eq!(
            config.version.signature(),
            format!("{}-20.37.0-98.5", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn partial_version_section() {
        let config = NodeConfig::from_toml(
            r#"
            [version]
            package = "24.03.1"
            minor = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.version.signature(), "24.03.1-20.37.0-98.7");
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = NodeConfig::from_toml(
            r"
            [version]
            flavour = 1
            ",
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_empty_schema() {
        let result = NodeConfig::from_toml(
            r#"
            [version]
            schema = " "
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn round_trips_through_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let config = NodeConfig {
            version: VersionConfig {
                package: "1.2.3".to_string(),
                ..VersionConfig::default()
            },
        };
        file.write_all(config.to_toml().unwrap().as_bytes())
            .unwrap();

        assert_eq!(NodeConfig::from_file(file.path()).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = NodeConfig::from_file(Path::new("/nonexistent/globalcfg.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
