//! The process graph: nodes, edges, per-node configuration and KPI definitions.

pub mod config;
pub mod conversion;
pub mod kpi;
pub mod node;
mod validate;

pub use config::*;
pub use conversion::*;
pub use kpi::*;
pub use node::*;
pub use validate::validate;

use crate::error::{DocumentError, GraphValidationError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The unit of work handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGraph {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub kpis: Vec<KpiDefinition>,
}

impl ProcessGraph {
    pub fn new(id: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            id: id.into(),
            name: None,
            nodes,
            edges,
            kpis: Vec::new(),
        }
    }

    pub fn with_kpis(mut self, kpis: Vec<KpiDefinition>) -> Self {
        self.kpis = kpis;
        self
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Validates the graph and returns it unchanged.
    pub fn validated(self) -> Result<Self, GraphValidationError> {
        validate(&self)?;
        Ok(self)
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a graph document from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }
}
