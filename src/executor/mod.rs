//! Node executors and the registry that dispatches to them by node type.

use crate::collaborator::Collaborators;
use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::error::NodeExecutionError;
use crate::graph::{Node, NodeKind, ProcessGraph};
use crate::kpi::{KpiBook, KpiChange};
use ahash::AHashMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

mod completion;
mod conditional;
mod fanout;
mod formula;
mod inference;
mod kpi;
mod source;
mod state;
mod transform;

pub use completion::TextCompletionExecutor;
pub use conditional::{ConditionalExecutor, compare_values};
pub use fanout::BranchFanoutExecutor;
pub use formula::FormulaExecutor;
pub use inference::MlInferExecutor;
pub use kpi::KpiUpdateExecutor;
pub use source::{AssetSourceExecutor, CsvSourceExecutor};
pub use state::StateChangeExecutor;
pub use transform::TransformExecutor;

/// Everything an executor may read while it runs. Executors never write to the context;
/// they return values and the scheduler writes them.
pub struct NodeEnv<'a> {
    pub graph: &'a ProcessGraph,
    pub context: &'a ExecutionContext,
    pub kpis: &'a KpiBook,
    pub collaborators: &'a Collaborators,
    pub config: &'a EngineConfig,
    pub now: DateTime<Utc>,
}

/// Which outgoing edges of a node stay live after it runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Routing {
    /// Every outgoing edge.
    #[default]
    All,
    /// Only edges whose handle is listed; unhandled edges stay live.
    Branches(Vec<String>),
}

impl Routing {
    pub fn admits(&self, handle: Option<&str>) -> bool {
        match (self, handle) {
            (_, None) | (Routing::All, _) => true,
            (Routing::Branches(selected), Some(handle)) => selected.iter().any(|b| b == handle),
        }
    }

    pub fn selected(&self) -> Option<&[String]> {
        match self {
            Routing::All => None,
            Routing::Branches(selected) => Some(selected),
        }
    }
}

/// Instructions from a node to the scheduler beyond its output value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Directive {
    #[default]
    Continue,
    /// End the run after this node; `failed` decides the terminal status.
    Halt { failed: bool },
}

/// A successful node execution.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutcome {
    pub value: Value,
    pub routing: Routing,
    pub directive: Directive,
    pub kpi_change: Option<KpiChange>,
}

impl NodeOutcome {
    pub fn value(value: Value) -> Self {
        Self {
            value,
            routing: Routing::All,
            directive: Directive::Continue,
            kpi_change: None,
        }
    }

    pub fn routed(mut self, routing: Routing) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directive = directive;
        self
    }

    pub fn with_kpi_change(mut self, change: KpiChange) -> Self {
        self.kpi_change = Some(change);
        self
    }
}

/// Defines the contract for executing one node type.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    fn kind(&self) -> NodeKind;

    async fn execute(
        &self,
        node: &Node,
        env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError>;
}

/// Reports a node whose config does not belong to the executor it was dispatched to.
pub(crate) fn config_mismatch(node: &Node, expected: NodeKind) -> NodeExecutionError {
    NodeExecutionError::InvalidConfig {
        node_id: node.id.clone(),
        message: format!(
            "executor for '{}' received a '{}' configuration",
            expected,
            node.kind()
        ),
    }
}

/// Maps node types to their executors.
pub struct ExecutorRegistry {
    executors: AHashMap<NodeKind, Box<dyn NodeExecutor>>,
}

/// Master macro to register all standard executors.
macro_rules! define_default_executors {
    ( $( $executor:ident ),* $(,)? ) => {
        fn register_default_executors(executors: &mut AHashMap<NodeKind, Box<dyn NodeExecutor>>) {
            $(
                let executor: Box<dyn NodeExecutor> = Box::new($executor);
                executors.insert(executor.kind(), executor);
            )*
        }
    };
}

define_default_executors! {
    CsvSourceExecutor,
    AssetSourceExecutor,
    TransformExecutor,
    ConditionalExecutor,
    TextCompletionExecutor,
    FormulaExecutor,
    BranchFanoutExecutor,
    StateChangeExecutor,
    MlInferExecutor,
    KpiUpdateExecutor,
}

impl ExecutorRegistry {
    /// A registry with one executor for every node type.
    pub fn with_defaults() -> Self {
        let mut executors = AHashMap::new();
        register_default_executors(&mut executors);
        Self { executors }
    }

    /// A registry with no executors; nodes fail with `UnsupportedNode` until registered.
    pub fn empty() -> Self {
        Self {
            executors: AHashMap::new(),
        }
    }

    /// Registers an executor, replacing any existing one for the same node type.
    pub fn register(&mut self, executor: Box<dyn NodeExecutor>) {
        self.executors.insert(executor.kind(), executor);
    }

    pub fn get(&self, kind: NodeKind) -> Option<&dyn NodeExecutor> {
        self.executors.get(&kind).map(|e| e.as_ref())
    }

    pub fn supports(&self, kind: NodeKind) -> bool {
        self.executors.contains_key(&kind)
    }

    /// Runs the executor registered for the node's type.
    pub async fn dispatch(
        &self,
        node: &Node,
        env: &NodeEnv<'_>,
    ) -> Result<NodeOutcome, NodeExecutionError> {
        let executor = self
            .get(node.kind())
            .ok_or_else(|| NodeExecutionError::UnsupportedNode(node.kind().to_string()))?;
        executor.execute(node, env).await
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
