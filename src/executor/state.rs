use super::{Directive, NodeEnv, NodeExecutor, NodeOutcome, config_mismatch};
use crate::error::NodeExecutionError;
use crate::graph::{NextAction, Node, NodeConfig, NodeKind, StateKind};
use crate::template;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

/// Emits a status marker and, for `stop` and `rollback`, ends the run.
pub struct StateChangeExecutor;

#[async_trait]
impl NodeExecutor for StateChangeExecutor {
    fn kind(&self) -> NodeKind {
        NodeKind::StateChange
    }

    async fn execute(
        &self,
        node: &Node,
        env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError> {
        let NodeConfig::StateChange(config) = &node.config else {
            return Err(config_mismatch(node, self.kind()));
        };

        let message = template::render(&config.message, env.context)?;
        let directive = match config.next_action {
            NextAction::Continue => Directive::Continue,
            NextAction::Stop => Directive::Halt {
                failed: config.state == StateKind::Error,
            },
            // Rollback is a failed stop; compensation is left to the caller.
            NextAction::Rollback => Directive::Halt { failed: true },
        };
        if directive != Directive::Continue {
            info!(node_id = %node.id, action = ?config.next_action, "state change ends the run");
        }

        Ok(NodeOutcome::value(json!({
            "state": config.state,
            "message": message,
        }))
        .with_directive(directive))
    }
}
