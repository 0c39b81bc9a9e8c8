use crate::error::DocumentError;
use crate::graph::{KpiDefinition, NodeKind};
use crate::kpi::KpiAlert;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Success,
    Error,
    Skipped,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeStatus::Success | NodeStatus::Error | NodeStatus::Skipped
        )
    }
}

/// Why a node did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Every incoming edge was dead.
    BranchNotTaken,
    /// An earlier node ended the run.
    RunHalted,
    /// The run was cancelled before the node started.
    Cancelled,
}

/// The record of one node within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionResult {
    pub node_id: String,
    pub node_type: NodeKind,
    pub label: String,
    pub status: NodeStatus,
    /// Set once the node succeeds; a `null` output stays `Some(Value::Null)`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Branch handles this node left live, for conditional and fan-out nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_branches: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

/// Reads a present field as `Some`, including an explicit `null`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A complete run: per-node results in execution order plus the final state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessExecution {
    pub id: String,
    pub graph_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub results: Vec<NodeExecutionResult>,
    pub context: Value,
    #[serde(default)]
    pub kpis: Vec<KpiDefinition>,
    #[serde(default)]
    pub alerts: Vec<KpiAlert>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate counts and timings for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetrics {
    pub total_nodes: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
    /// Sum of node durations.
    pub node_time_ms: u64,
    /// Wall-clock time from start to finish, once finished.
    pub wall_time_ms: Option<u64>,
}

impl ProcessExecution {
    pub fn result(&self, node_id: &str) -> Option<&NodeExecutionResult> {
        self.results.iter().find(|r| r.node_id == node_id)
    }

    pub fn status_of(&self, node_id: &str) -> Option<NodeStatus> {
        self.result(node_id).map(|r| r.status)
    }

    /// Ids of the nodes that actually ran, in execution order.
    pub fn executed_nodes(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, NodeStatus::Success | NodeStatus::Error))
            .map(|r| r.node_id.as_str())
            .collect()
    }

    pub fn metrics(&self) -> ExecutionMetrics {
        let mut metrics = ExecutionMetrics {
            total_nodes: self.results.len(),
            ..Default::default()
        };
        for result in &self.results {
            match result.status {
                NodeStatus::Success => metrics.succeeded += 1,
                NodeStatus::Error => metrics.failed += 1,
                NodeStatus::Skipped => metrics.skipped += 1,
                NodeStatus::Pending | NodeStatus::Running => metrics.pending += 1,
            }
            metrics.node_time_ms += result.duration_ms;
        }
        metrics.wall_time_ms = self.finished_at.map(|finished| {
            (finished - self.started_at)
                .num_milliseconds()
                .try_into()
                .unwrap_or(0)
        });
        metrics
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
