use serde::Deserialize;
use std::path::Path;

use crate::errors::{JobDeltaError, Result};
use crate::logging_facility::Profile;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Engine configuration, read from TOML.
///
/// Every section is optional; an empty document yields the defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub change_order: ChangeOrderConfig,
}

impl EngineConfig {
    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// `Config` if the document is not valid TOML or has unknown keys.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| JobDeltaError::Config {
            message: e.to_string(),
        })
    }

    /// Read and parse a TOML configuration file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Config` if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| JobDeltaError::Io {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&input)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_profile")]
    pub profile: Profile,
    /// `EnvFilter` directive overriding the profile's default level
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_profile() -> Profile {
    Profile::Development
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            filter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeOrderConfig {
    /// Refuse to build a change order that has no deltas
    #[serde(default = "default_reject_empty")]
    pub reject_empty: bool,
}

fn default_reject_empty() -> bool {
    true
}

impl Default for ChangeOrderConfig {
    fn default() -> Self {
        Self {
            reject_empty: default_reject_empty(),
        }
    }
}
