use super::{NodeEnv, NodeExecutor, NodeOutcome, config_mismatch};
use crate::collaborator::CompletionRequest;
use crate::error::{CollaboratorError, NodeExecutionError};
use crate::graph::{Node, NodeConfig, NodeKind};
use crate::template;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Renders the prompt and hands it to the configured text-completion service.
pub struct TextCompletionExecutor;

#[async_trait]
impl NodeExecutor for TextCompletionExecutor {
    fn kind(&self) -> NodeKind {
        NodeKind::TextCompletion
    }

    async fn execute(
        &self,
        node: &Node,
        env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError> {
        let NodeConfig::TextCompletion(config) = &node.config else {
            return Err(config_mismatch(node, self.kind()));
        };

        // Rendering comes first so a missing variable is reported even without a service.
        let prompt = template::render(&config.prompt, env.context)?;
        let system = config
            .system
            .as_deref()
            .map(|system| template::render(system, env.context))
            .transpose()?;

        let completion = env
            .collaborators
            .completion
            .as_ref()
            .ok_or_else(|| CollaboratorError::Unconfigured {
                service: "text-completion".to_string(),
            })?;

        debug!(
            node_id = %node.id,
            model = %config.model,
            placeholders = ?template::placeholders(&config.prompt),
            "requesting completion"
        );
        let text = completion
            .complete(CompletionRequest {
                model: config.model.clone(),
                system,
                prompt,
                temperature: config.temperature,
                max_tokens: config.max_tokens,
                top_p: config.top_p,
            })
            .await?;

        Ok(NodeOutcome::value(Value::String(text)))
    }
}
