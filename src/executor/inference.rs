use super::{NodeEnv, NodeExecutor, NodeOutcome, config_mismatch};
use crate::collaborator::InferenceRequest;
use crate::error::{CollaboratorError, NodeExecutionError};
use crate::graph::{Node, NodeConfig, NodeKind};
use crate::value::{as_number, number};
use async_trait::async_trait;
use serde_json::{Map, json};
use tracing::debug;

/// Gathers numeric features from the context and asks the inference service for a
/// prediction.
pub struct MlInferExecutor;

#[async_trait]
impl NodeExecutor for MlInferExecutor {
    fn kind(&self) -> NodeKind {
        NodeKind::MlInfer
    }

    async fn execute(
        &self,
        node: &Node,
        env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError> {
        let NodeConfig::MlInfer(config) = &node.config else {
            return Err(config_mismatch(node, self.kind()));
        };

        let mut features = Map::new();
        for name in &config.features {
            let raw = env
                .context
                .resolve(name)
                .ok_or_else(|| NodeExecutionError::missing(name.clone()))?;
            let value = as_number(raw)
                .ok_or_else(|| NodeExecutionError::mismatch("ml-infer", "Number", raw))?;
            features.insert(name.clone(), number(value));
        }

        let model = env
            .collaborators
            .inference
            .as_ref()
            .ok_or_else(|| CollaboratorError::Unconfigured {
                service: "ml-inference".to_string(),
            })?;

        debug!(
            node_id = %node.id,
            model_id = %config.model_id,
            features = features.len(),
            "running inference"
        );
        let prediction = model
            .infer(InferenceRequest {
                model_id: config.model_id.clone(),
                model_kind: config.model_kind,
                features,
            })
            .await?;

        Ok(NodeOutcome::value(json!({
            "prediction": prediction.prediction,
            "confidence": prediction.confidence,
        })))
    }
}
