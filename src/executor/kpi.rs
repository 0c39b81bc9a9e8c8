use super::{NodeEnv, NodeExecutor, NodeOutcome, config_mismatch};
use crate::context::collection_of;
use crate::error::NodeExecutionError;
use crate::graph::{Node, NodeConfig, NodeKind, ValueSource};
use crate::kpi::KpiChange;
use crate::value::{as_number, lookup_path, number};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Records a new value on a KPI and evaluates its thresholds.
///
/// The change is returned to the scheduler, which applies it to the run's KPI book
/// together with any alert.
pub struct KpiUpdateExecutor;

#[async_trait]
impl NodeExecutor for KpiUpdateExecutor {
    fn kind(&self) -> NodeKind {
        NodeKind::KpiUpdate
    }

    async fn execute(
        &self,
        node: &Node,
        env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError> {
        let NodeConfig::KpiUpdate(config) = &node.config else {
            return Err(config_mismatch(node, self.kind()));
        };

        let kpi = env
            .kpis
            .get(&config.kpi_id)
            .ok_or_else(|| NodeExecutionError::UnknownKpi(config.kpi_id.clone()))?;
        let value = resolve_source(node, &config.source, env)?;

        let change = KpiChange::compute(
            kpi,
            value,
            config.threshold.as_ref(),
            config.keep_history,
            env.now,
        );
        match change.alert {
            Some(level) => warn!(
                node_id = %node.id,
                kpi_id = %kpi.id,
                value,
                level = %level,
                "KPI threshold crossed"
            ),
            None => debug!(node_id = %node.id, kpi_id = %kpi.id, value, "KPI updated"),
        }

        Ok(NodeOutcome::value(json!({
            "kpiId": change.kpi_id,
            "previousValue": change.previous_value,
            "newValue": change.new_value,
            "alertRaised": change.alert.is_some(),
            "alertLevel": change.alert,
        }))
        .with_kpi_change(change))
    }
}

fn resolve_source(
    node: &Node,
    source: &ValueSource,
    env: &NodeEnv<'_>,
) -> Result<f64, NodeExecutionError> {
    let raw = match source {
        ValueSource::Fixed { value } => return finite(node, *value),
        ValueSource::ContextVariable { variable } => env
            .context
            .resolve(variable)
            .ok_or_else(|| NodeExecutionError::missing(variable.clone()))?,
        ValueSource::UpstreamNode { node_id, field } => {
            let upstream = env
                .graph
                .node(node_id)
                .ok_or_else(|| NodeExecutionError::InvalidConfig {
                    node_id: node.id.clone(),
                    message: format!("value source refers to unknown node '{}'", node_id),
                })?;
            let name = upstream.output_name();
            let output = env
                .context
                .get(name)
                .ok_or_else(|| NodeExecutionError::missing(name))?;
            match field {
                None => output,
                Some(path) => field_of(output, path)
                    .ok_or_else(|| NodeExecutionError::missing(format!("{}.{}", name, path)))?,
            }
        }
    };
    let value =
        as_number(raw).ok_or_else(|| NodeExecutionError::mismatch("kpi-update", "Number", raw))?;
    finite(node, value)
}

/// A field of a record, or of the first row of a collection.
fn field_of<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    lookup_path(value, path).or_else(|| {
        collection_of(value)
            .and_then(|rows| rows.first())
            .and_then(|row| lookup_path(row, path))
    })
}

fn finite(node: &Node, value: f64) -> Result<f64, NodeExecutionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(NodeExecutionError::mismatch(
            &format!("kpi-update '{}'", node.id),
            "finite Number",
            &number(value),
        ))
    }
}
