use super::{NodeEnv, NodeExecutor, NodeOutcome, config_mismatch};
use crate::error::NodeExecutionError;
use crate::formula::{Formula, round_to};
use crate::graph::{Node, NodeConfig, NodeKind};
use crate::value::number;
use async_trait::async_trait;
use tracing::debug;

/// Evaluates an arithmetic formula over context variables and rounds the result.
pub struct FormulaExecutor;

#[async_trait]
impl NodeExecutor for FormulaExecutor {
    fn kind(&self) -> NodeKind {
        NodeKind::Formula
    }

    async fn execute(
        &self,
        node: &Node,
        env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError> {
        let NodeConfig::Formula(config) = &node.config else {
            return Err(config_mismatch(node, self.kind()));
        };

        let formula = Formula::parse(&config.expression)?;
        let evaluation = formula.evaluate_in(env.context)?;
        let precision = config.precision.unwrap_or(env.config.default_precision);
        let value = round_to(evaluation.value, precision);

        if env.config.explain_formulas {
            debug!(
                node_id = %node.id,
                explanation = %evaluation.explain(),
                value,
                "formula evaluated"
            );
        }
        Ok(NodeOutcome::value(number(value)))
    }
}
