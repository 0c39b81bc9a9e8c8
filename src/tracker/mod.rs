//! Per-node bookkeeping for a run and the execution record it produces.

mod execution;
mod report;

pub use execution::{
    ExecutionMetrics, NodeExecutionResult, NodeStatus, ProcessExecution, RunStatus, SkipReason,
};
pub use report::ExecutionReport;

use crate::graph::{KpiDefinition, Node};
use crate::kpi::KpiAlert;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

/// Builds a `ProcessExecution` node by node.
///
/// Results are created as `pending` in execution order when the run starts and each
/// one moves to exactly one terminal status. Once `finish` is called the execution is
/// handed over and the tracker is gone.
#[derive(Debug)]
pub struct ExecutionTracker {
    execution: ProcessExecution,
}

impl ExecutionTracker {
    pub fn start(
        execution_id: impl Into<String>,
        graph_id: impl Into<String>,
        order: &[&Node],
        started_at: DateTime<Utc>,
    ) -> Self {
        let results = order
            .iter()
            .map(|node| NodeExecutionResult {
                node_id: node.id.clone(),
                node_type: node.kind(),
                label: node.label.clone(),
                status: NodeStatus::Pending,
                output: None,
                error: None,
                duration_ms: 0,
                started_at: None,
                selected_branches: None,
                skip_reason: None,
            })
            .collect();

        Self {
            execution: ProcessExecution {
                id: execution_id.into(),
                graph_id: graph_id.into(),
                started_at,
                finished_at: None,
                status: RunStatus::Running,
                results,
                context: Value::Object(Default::default()),
                kpis: Vec::new(),
                alerts: Vec::new(),
                error: None,
            },
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution.id
    }

    /// The execution as it stands, for progress reporting.
    pub fn snapshot(&self) -> &ProcessExecution {
        &self.execution
    }

    pub fn result(&self, index: usize) -> Option<&NodeExecutionResult> {
        self.execution.results.get(index)
    }

    pub fn begin(&mut self, index: usize, at: DateTime<Utc>) {
        if let Some(result) = self.pending(index) {
            result.status = NodeStatus::Running;
            result.started_at = Some(at);
        }
    }

    pub fn succeed(
        &mut self,
        index: usize,
        output: Value,
        selected_branches: Option<Vec<String>>,
        elapsed: Duration,
    ) {
        if let Some(result) = self.running(index) {
            result.status = NodeStatus::Success;
            result.output = Some(output);
            result.selected_branches = selected_branches;
            result.duration_ms = millis(elapsed);
        }
    }

    pub fn fail(&mut self, index: usize, error: String, elapsed: Duration) {
        if let Some(result) = self.running(index) {
            result.status = NodeStatus::Error;
            result.error = Some(error);
            result.duration_ms = millis(elapsed);
        }
    }

    pub fn skip(&mut self, index: usize, reason: SkipReason) {
        if let Some(result) = self.pending(index) {
            result.status = NodeStatus::Skipped;
            result.skip_reason = Some(reason);
        }
    }

    /// Skips every result from `from` onwards that has not reached a terminal status.
    pub fn skip_remaining(&mut self, from: usize, reason: SkipReason) {
        for index in from..self.execution.results.len() {
            self.skip(index, reason);
        }
    }

    pub fn record_alert(&mut self, alert: KpiAlert) {
        self.execution.alerts.push(alert);
    }

    /// Freezes the execution with its terminal status and final state.
    pub fn finish(
        mut self,
        status: RunStatus,
        context: Value,
        kpis: Vec<KpiDefinition>,
        error: Option<String>,
        at: DateTime<Utc>,
    ) -> ProcessExecution {
        debug_assert!(status.is_terminal());
        self.execution.status = status;
        self.execution.context = context;
        self.execution.kpis = kpis;
        self.execution.error = error;
        self.execution.finished_at = Some(at);
        self.execution
    }

    fn pending(&mut self, index: usize) -> Option<&mut NodeExecutionResult> {
        self.execution
            .results
            .get_mut(index)
            .filter(|r| r.status == NodeStatus::Pending)
    }

    fn running(&mut self, index: usize) -> Option<&mut NodeExecutionResult> {
        self.execution
            .results
            .get_mut(index)
            .filter(|r| r.status == NodeStatus::Running)
    }
}

fn millis(elapsed: Duration) -> u64 {
    elapsed.as_millis().try_into().unwrap_or(u64::MAX)
}
