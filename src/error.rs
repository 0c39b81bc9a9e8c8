use serde_json::Value;
use thiserror::Error;

/// Errors raised while validating a graph, before any node runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphValidationError {
    #[error("Process graph '{graph_id}' has no nodes")]
    EmptyGraph { graph_id: String },

    #[error("Node id '{node_id}' is declared more than once")]
    DuplicateNodeId { node_id: String },

    #[error(
        "Edge '{source_id}' -> '{target_id}' references node '{missing_node_id}', which is not in the graph"
    )]
    DanglingEdge {
        source_id: String,
        target_id: String,
        missing_node_id: String,
    },

    #[error(
        "Edge '{source_id}' -> '{target_id}' uses handle '{handle}', but node '{source_id}' only declares {declared:?}"
    )]
    UnknownBranchHandle {
        source_id: String,
        target_id: String,
        handle: String,
        declared: Vec<String>,
    },

    #[error(
        "Edge '{source_id}' -> '{target_id}' leaves a branching node but carries no branch handle"
    )]
    MissingBranchHandle {
        source_id: String,
        target_id: String,
    },

    #[error(
        "Edge '{source_id}' -> '{target_id}' carries handle '{handle}', but node '{source_id}' does not branch"
    )]
    UnexpectedBranchHandle {
        source_id: String,
        target_id: String,
        handle: String,
    },
}

/// Errors produced by the formula language.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Formula syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Division by zero in '{expression}'")]
    DivisionByZero { expression: String },

    #[error("Formula produced a non-finite result ({value})")]
    NonFinite { value: f64 },
}

/// Failures reported by an external collaborator (text completion, inference, asset catalog).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("No {service} collaborator is configured")]
    Unconfigured { service: String },

    #[error("The {service} collaborator failed: {message}")]
    Failed { service: String, message: String },
}

/// Errors that can occur while a single node executes.
///
/// These never escape the scheduler; they are recorded on the node's result and the
/// node's failure policy decides whether the run continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeExecutionError {
    #[error("Variable '{name}' not found in the execution context")]
    MissingVariable { name: String },

    #[error(
        "Type mismatch during operation '{operation}': expected {expected}, but found value '{found}'"
    )]
    TypeMismatch {
        operation: String,
        expected: String,
        found: Value,
    },

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(#[from] CollaboratorError),

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("KPI '{0}' is not defined on this graph")]
    UnknownKpi(String),

    #[error("Entity '{entity_id}' was not found in the {catalog} catalog")]
    EntityNotFound { catalog: String, entity_id: String },

    #[error("Dataset could not be loaded: {0}")]
    Dataset(String),

    #[error("Node '{node_id}' has an invalid configuration: {message}")]
    InvalidConfig { node_id: String, message: String },

    #[error("No executor is registered for node type '{0}'")]
    UnsupportedNode(String),

    #[error("Executor panicked: {0}")]
    ExecutorPanicked(String),
}

impl NodeExecutionError {
    pub(crate) fn missing(name: impl Into<String>) -> Self {
        NodeExecutionError::MissingVariable { name: name.into() }
    }

    pub(crate) fn mismatch(operation: &str, expected: &str, found: &Value) -> Self {
        NodeExecutionError::TypeMismatch {
            operation: operation.to_string(),
            expected: expected.to_string(),
            found: found.clone(),
        }
    }
}

/// Errors surfaced synchronously by the engine before a run starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Graph validation failed: {0}")]
    Validation(#[from] GraphValidationError),

    #[error("Cycle detected between nodes {nodes:?}")]
    CycleDetected { nodes: Vec<String> },

    #[error("Graph '{graph_id}' is already executing")]
    AlreadyExecuting { graph_id: String },

    #[error("Execution id '{execution_id}' belongs to a run that is still in flight")]
    DuplicateExecutionId { execution_id: String },
}

/// Errors reading or writing graph and execution documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to parse document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors loading engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid engine configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
