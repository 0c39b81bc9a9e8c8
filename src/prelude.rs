//! Prelude module for convenient imports
//!
//! Re-exports the types needed to build graphs, run them and read the results.
//!
//! # Example
//!
//! ```rust,no_run
//! use procflow::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let graph = ProcessGraph::from_file("path/to/graph.json")?;
//! let ctx = ExecutionContext::from_file("path/to/input.json")?;
//!
//! let engine = ProcessEngine::builder()
//!     .with_config(EngineConfig::from_file("path/to/engine.json")?)
//!     .build();
//! let execution = futures::executor::block_on(engine.execute(&graph, ctx))?;
//!
//! println!("{}", execution.report());
//! # Ok(())
//! # }
//! ```

// Engine and configuration
pub use crate::config::{CyclePolicy, EngineConfig};
pub use crate::scheduler::{ProcessEngine, ProcessEngineBuilder, RunOptions, validate};

// Graph model
pub use crate::graph::{
    AggregateFunction, BranchFanoutConfig, BranchSpec, ComparisonOperator, ConditionalConfig,
    Criticality, Edge, FailurePolicy, FanoutStrategy, FormulaConfig, IntoGraph, KpiDefinition,
    KpiUpdateConfig, MlInferConfig, ModelKind, NextAction, Node, NodeConfig, NodeKind,
    ProcessGraph, SourceAssetConfig, SourceCsvConfig, StateChangeConfig, StateKind,
    TextCompletionConfig, ThresholdConfig, ThresholdDirection, TransformConfig,
    TransformOperation, ValueSource, ValueType,
};

// Runtime state and results
pub use crate::context::ExecutionContext;
pub use crate::kpi::{AlertLevel, KpiAlert};
pub use crate::tracker::{
    ExecutionMetrics, NodeExecutionResult, NodeStatus, ProcessExecution, RunStatus, SkipReason,
};

// Extension points
pub use crate::collaborator::{
    AssetCatalog, Collaborators, CompletionRequest, InferenceModel, InferenceRequest, Prediction,
    TextCompletion,
};
pub use crate::executor::{NodeEnv, NodeExecutor, NodeOutcome, Routing};
pub use crate::formula::Formula;

// Error types
pub use crate::error::{
    CollaboratorError, DocumentError, EngineError, FormulaError, GraphValidationError,
    NodeExecutionError,
};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
