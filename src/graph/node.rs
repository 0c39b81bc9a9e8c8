use super::config::{NodeConfig, NodeKind};
use serde::{Deserialize, Serialize};

/// What the scheduler does when a node fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the error and keep running.
    #[default]
    Continue,
    /// Stop the run and mark it failed.
    Fail,
}

/// A single processing step. Nodes are pure data; behavior lives in the executors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(flatten)]
    pub config: NodeConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_variable: Option<String>,
    #[serde(default)]
    pub on_error: FailurePolicy,
}

impl Node {
    pub fn new(id: impl Into<String>, config: NodeConfig) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            config,
            output_variable: None,
            on_error: FailurePolicy::Continue,
        }
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn output_to(mut self, variable: impl Into<String>) -> Self {
        self.output_variable = Some(variable.into());
        self
    }

    pub fn on_error(mut self, policy: FailurePolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }

    /// The context variable this node's output is written to.
    pub fn output_name(&self) -> &str {
        self.output_variable.as_deref().unwrap_or(&self.id)
    }
}

/// A directed connection. `handle` names the source branch for branching nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(
        default,
        alias = "sourceHandle",
        skip_serializing_if = "Option::is_none"
    )]
    pub handle: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            handle: None,
        }
    }

    pub fn branch(
        source: impl Into<String>,
        handle: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            handle: Some(handle.into()),
        }
    }
}
