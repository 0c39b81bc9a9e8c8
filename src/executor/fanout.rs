use super::{NodeEnv, NodeExecutor, NodeOutcome, Routing, config_mismatch};
use crate::error::NodeExecutionError;
use crate::graph::{BranchFanoutConfig, FanoutStrategy, Node, NodeConfig, NodeKind};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Declares the branches a run may continue along.
///
/// Branches never run concurrently. `parallel` and `sequential` keep every branch
/// live and differ only in intent; `priority` keeps the branch with the lowest
/// priority value and `race` keeps the first declared branch.
pub struct BranchFanoutExecutor;

#[async_trait]
impl NodeExecutor for BranchFanoutExecutor {
    fn kind(&self) -> NodeKind {
        NodeKind::BranchFanout
    }

    async fn execute(
        &self,
        node: &Node,
        _env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError> {
        let NodeConfig::BranchFanout(config) = &node.config else {
            return Err(config_mismatch(node, self.kind()));
        };
        if let Some(count) = config.branch_count {
            if count != config.branches.len() {
                return Err(NodeExecutionError::InvalidConfig {
                    node_id: node.id.clone(),
                    message: format!(
                        "branchCount is {} but {} branches are declared",
                        count,
                        config.branches.len()
                    ),
                });
            }
        }

        let selected = select_branches(config);
        let branches: Vec<Value> = config
            .branches
            .iter()
            .map(|branch| {
                json!({
                    "id": branch.id,
                    "label": branch.label.as_deref().unwrap_or(&branch.id),
                    "selected": selected.contains(&branch.id),
                })
            })
            .collect();

        Ok(NodeOutcome::value(json!({
            "strategy": config.strategy,
            "branches": branches,
        }))
        .routed(Routing::Branches(selected)))
    }
}

fn select_branches(config: &BranchFanoutConfig) -> Vec<String> {
    match config.strategy {
        FanoutStrategy::Parallel | FanoutStrategy::Sequential => {
            config.branches.iter().map(|b| b.id.clone()).collect()
        }
        // min_by_key keeps the first of equal keys, so ties go to declaration order.
        FanoutStrategy::Priority => config
            .branches
            .iter()
            .min_by_key(|b| b.priority.unwrap_or(i32::MAX))
            .map(|b| vec![b.id.clone()])
            .unwrap_or_default(),
        FanoutStrategy::Race => config
            .branches
            .first()
            .map(|b| vec![b.id.clone()])
            .unwrap_or_default(),
    }
}
