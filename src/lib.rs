//! # procflow - Process Graph Execution Engine
//!
//! **procflow** executes user-authored process graphs: directed graphs of typed nodes
//! (data sources, transforms, conditionals, text completion, formulas, fan-outs, state
//! markers, ML inference and KPI updates) that run in dependency order over a shared
//! variable context. Conditionals and fan-outs select which branches stay live, and
//! every run produces a structured, replayable [`ProcessExecution`](tracker::ProcessExecution).
//!
//! ## Core Workflow
//!
//! 1.  **Describe the graph**: load a [`ProcessGraph`](graph::ProcessGraph) from JSON, build it in code,
//!     or implement [`IntoGraph`](graph::IntoGraph) for your editor's document format.
//! 2.  **Configure the engine**: use [`ProcessEngine::builder`](scheduler::ProcessEngine::builder) to set
//!     the cycle policy, plug in collaborators and override executors.
//! 3.  **Execute**: call `execute` with an initial context. Node failures are recorded on the
//!     execution instead of aborting the call.
//! 4.  **Inspect**: read per-node results, metrics, KPI alerts, or print a report.
//!
//! ## Quick Start
//!
//! ```rust
//! use procflow::prelude::*;
//! use serde_json::json;
//!
//! let graph = ProcessGraph::new(
//!     "fees",
//!     vec![
//!         Node::new("fee", NodeConfig::Formula(FormulaConfig {
//!             expression: "amount * 0.1".to_string(),
//!             precision: None,
//!         })),
//!         Node::new("check", NodeConfig::Conditional(ConditionalConfig {
//!             variable: "fee".to_string(),
//!             operator: ComparisonOperator::GreaterThan,
//!             value: json!(5),
//!             value_type: ValueType::Number,
//!         })),
//!     ],
//!     vec![Edge::new("fee", "check")],
//! );
//!
//! let engine = ProcessEngine::new();
//! let ctx = ExecutionContext::new().with("amount", json!(100));
//! let execution = futures::executor::block_on(engine.execute(&graph, ctx)).unwrap();
//!
//! assert_eq!(execution.status, RunStatus::Completed);
//! assert_eq!(execution.context["fee"], json!(10.0));
//! assert_eq!(execution.context["check"]["selectedBranch"], json!("true"));
//! ```

pub mod collaborator;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod formula;
pub mod graph;
pub mod kpi;
pub mod prelude;
pub mod scheduler;
pub mod template;
pub mod tracker;
pub mod value;
