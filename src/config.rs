//! Engine-wide settings.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What the scheduler does when the graph contains a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Reject the graph with `CycleDetected` before any node runs.
    #[default]
    Fail,
    /// Run the nodes that remain after ordering in their original list order.
    Append,
}

/// Settings shared by every run of a `ProcessEngine`.
///
/// ```json
/// { "cyclePolicy": "append", "defaultPrecision": 4, "explainFormulas": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub cycle_policy: CyclePolicy,
    /// Decimal places for formula results when the node does not set its own.
    pub default_precision: u32,
    /// Log a step-by-step account of every formula evaluation at debug level.
    pub explain_formulas: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_policy: CyclePolicy::Fail,
            default_precision: 2,
            explain_formulas: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }
}
