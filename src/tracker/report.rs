use super::execution::{NodeExecutionResult, NodeStatus, ProcessExecution, SkipReason};
use std::fmt::Write;

const OUTPUT_PREVIEW: usize = 72;

/// Formats an execution into a human-readable trace.
pub struct ExecutionReport;

impl ExecutionReport {
    pub fn format(execution: &ProcessExecution) -> String {
        let metrics = execution.metrics();
        let mut out = String::new();

        let _ = write!(
            out,
            "Execution {} of graph '{}': {:?}",
            execution.id, execution.graph_id, execution.status
        );
        if let Some(ms) = metrics.wall_time_ms {
            let _ = write!(out, " in {} ms", ms);
        }
        out.push('\n');
        if let Some(error) = &execution.error {
            let _ = writeln!(out, "  error: {}", error);
        }

        for result in &execution.results {
            out.push_str(&Self::format_result(result));
            out.push('\n');
        }

        if !execution.alerts.is_empty() {
            out.push_str("Alerts:\n");
            for alert in &execution.alerts {
                let _ = writeln!(
                    out,
                    "  {}: KPI '{}' = {} (node '{}')",
                    alert.level, alert.kpi_id, alert.value, alert.node_id
                );
            }
        }

        let _ = write!(
            out,
            "{} succeeded, {} failed, {} skipped of {} nodes",
            metrics.succeeded, metrics.failed, metrics.skipped, metrics.total_nodes
        );
        out
    }

    fn format_result(result: &NodeExecutionResult) -> String {
        let status = match result.status {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Success => "success",
            NodeStatus::Error => "error",
            NodeStatus::Skipped => "skipped",
        };
        let mut line = format!("  [{:<7}] {} ({})", status, result.label, result.node_type);

        match result.status {
            NodeStatus::Success => {
                let _ = write!(line, " {} ms", result.duration_ms);
                if let Some(branches) = &result.selected_branches {
                    let _ = write!(line, " -> [{}]", branches.join(", "));
                }
                if let Some(output) = &result.output {
                    let _ = write!(line, " = {}", preview(&output.to_string()));
                }
            }
            NodeStatus::Error => {
                let _ = write!(
                    line,
                    " {} ms: {}",
                    result.duration_ms,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            NodeStatus::Skipped => {
                let reason = match result.skip_reason {
                    Some(SkipReason::BranchNotTaken) => "branch not taken",
                    Some(SkipReason::RunHalted) => "run halted",
                    Some(SkipReason::Cancelled) => "cancelled",
                    None => "not reached",
                };
                let _ = write!(line, ": {}", reason);
            }
            NodeStatus::Pending | NodeStatus::Running => {}
        }
        line
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= OUTPUT_PREVIEW {
        text.to_string()
    } else {
        let cut: String = text.chars().take(OUTPUT_PREVIEW).collect();
        format!("{}...", cut)
    }
}

impl ProcessExecution {
    /// A human-readable account of the run, one line per node.
    pub fn report(&self) -> String {
        ExecutionReport::format(self)
    }
}
