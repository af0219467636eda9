//! Pipeline settings read from TOML.
//!
//! ```toml
//! [statistics]
//! before = false
//! after = true
//!
//! [pipeline]
//! allow_metadata_change = true
//!
//! [preview]
//! indexes = [0, 3]
//!
//! [logging]
//! filter = "info,dataprep_rs=debug"
//! ```
//!
//! Every table and field may be omitted.

use crate::error::{PrepError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default tracing filter when neither the settings nor `RUST_LOG` set one.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub statistics: StatisticsSettings,
    pub pipeline: ExecutionSettings,
    pub preview: PreviewSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsSettings {
    /// Analyze every column before the first action.
    pub before: bool,
    /// Re-analyze modified columns after the last action.
    pub after: bool,
}

impl Default for StatisticsSettings {
    fn default() -> Self {
        Self {
            before: false,
            after: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    pub allow_metadata_change: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            allow_metadata_change: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// Row positions to keep in a preview; all rows when unset.
    pub indexes: Option<Vec<u64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PipelineSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse settings {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PrepError::Serialization(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("Failed to write settings {}", path.display()))
    }
}
