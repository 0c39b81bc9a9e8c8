use super::kpi::ThresholdConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Branch handles selected by a conditional node.
pub const TRUE_BRANCH: &str = "true";
pub const FALSE_BRANCH: &str = "false";

/// The closed set of node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    SourceCsv,
    SourceAsset,
    Transform,
    Conditional,
    TextCompletion,
    Formula,
    BranchFanout,
    StateChange,
    MlInfer,
    KpiUpdate,
}

impl NodeKind {
    pub const ALL: [NodeKind; 10] = [
        NodeKind::SourceCsv,
        NodeKind::SourceAsset,
        NodeKind::Transform,
        NodeKind::Conditional,
        NodeKind::TextCompletion,
        NodeKind::Formula,
        NodeKind::BranchFanout,
        NodeKind::StateChange,
        NodeKind::MlInfer,
        NodeKind::KpiUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::SourceCsv => "source-csv",
            NodeKind::SourceAsset => "source-asset",
            NodeKind::Transform => "transform",
            NodeKind::Conditional => "conditional",
            NodeKind::TextCompletion => "text-completion",
            NodeKind::Formula => "formula",
            NodeKind::BranchFanout => "branch-fanout",
            NodeKind::StateChange => "state-change",
            NodeKind::MlInfer => "ml-infer",
            NodeKind::KpiUpdate => "kpi-update",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific node configuration, tagged by the node's `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "kebab-case")]
pub enum NodeConfig {
    SourceCsv(SourceCsvConfig),
    SourceAsset(SourceAssetConfig),
    Transform(TransformConfig),
    Conditional(ConditionalConfig),
    TextCompletion(TextCompletionConfig),
    Formula(FormulaConfig),
    BranchFanout(BranchFanoutConfig),
    StateChange(StateChangeConfig),
    MlInfer(MlInferConfig),
    KpiUpdate(KpiUpdateConfig),
}

impl NodeConfig {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::SourceCsv(_) => NodeKind::SourceCsv,
            NodeConfig::SourceAsset(_) => NodeKind::SourceAsset,
            NodeConfig::Transform(_) => NodeKind::Transform,
            NodeConfig::Conditional(_) => NodeKind::Conditional,
            NodeConfig::TextCompletion(_) => NodeKind::TextCompletion,
            NodeConfig::Formula(_) => NodeKind::Formula,
            NodeConfig::BranchFanout(_) => NodeKind::BranchFanout,
            NodeConfig::StateChange(_) => NodeKind::StateChange,
            NodeConfig::MlInfer(_) => NodeKind::MlInfer,
            NodeConfig::KpiUpdate(_) => NodeKind::KpiUpdate,
        }
    }

    /// Branch handles this node declares, or `None` for non-branching nodes.
    pub fn declared_branches(&self) -> Option<Vec<String>> {
        match self {
            NodeConfig::Conditional(_) => {
                Some(vec![TRUE_BRANCH.to_string(), FALSE_BRANCH.to_string()])
            }
            NodeConfig::BranchFanout(cfg) => {
                Some(cfg.branches.iter().map(|b| b.id.clone()).collect())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceCsvConfig {
    pub file_name: Option<String>,
    pub delimiter: Option<char>,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAssetConfig {
    pub asset_id: String,
    #[serde(default)]
    pub criticality: Option<Criticality>,
    /// Fields to expose; empty exposes every field of the asset.
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformConfig {
    /// Variable holding the collection; defaults to the most recent array-shaped value.
    #[serde(default)]
    pub input: Option<String>,
    pub operation: TransformOperation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum TransformOperation {
    /// Computes `formula` for every row and stores it under `target`.
    Map { target: String, formula: String },
    Filter {
        field: String,
        operator: ComparisonOperator,
        value: Value,
    },
    Aggregate {
        field: String,
        function: AggregateFunction,
        #[serde(default, rename = "groupBy")]
        group_by: Option<String>,
    },
    Sort {
        field: String,
        #[serde(default)]
        descending: bool,
    },
    Enrich { fields: Map<String, Value> },
}

impl TransformOperation {
    pub fn name(&self) -> &'static str {
        match self {
            TransformOperation::Map { .. } => "map",
            TransformOperation::Filter { .. } => "filter",
            TransformOperation::Aggregate { .. } => "aggregate",
            TransformOperation::Sort { .. } => "sort",
            TransformOperation::Enrich { .. } => "enrich",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::GreaterThanOrEqual => ">=",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::Contains => "contains",
            ComparisonOperator::StartsWith => "startsWith",
            ComparisonOperator::EndsWith => "endsWith",
        }
    }
}

/// How a conditional coerces both operands before comparing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Auto,
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalConfig {
    pub variable: String,
    pub operator: ComparisonOperator,
    pub value: Value,
    #[serde(default)]
    pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextCompletionConfig {
    pub prompt: String,
    #[serde(default)]
    pub system: Option<String>,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaConfig {
    pub expression: String,
    /// Decimal places kept; the engine default applies when unset.
    #[serde(default)]
    pub precision: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanoutStrategy {
    /// Descriptive only: branches still run one after another.
    #[default]
    Parallel,
    Sequential,
    Priority,
    Race,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSpec {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchFanoutConfig {
    #[serde(default)]
    pub branch_count: Option<usize>,
    #[serde(default)]
    pub strategy: FanoutStrategy,
    pub branches: Vec<BranchSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Success,
    Warning,
    Error,
    Pending,
    Info,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    #[default]
    Continue,
    Stop,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChangeConfig {
    pub state: StateKind,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub next_action: NextAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Classification,
    Regression,
    Clustering,
    Anomaly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlInferConfig {
    pub model_id: String,
    pub model_kind: ModelKind,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Where a kpi-update node reads its numeric value from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValueSource {
    ContextVariable {
        variable: String,
    },
    Fixed {
        value: f64,
    },
    UpstreamNode {
        #[serde(rename = "nodeId")]
        node_id: String,
        #[serde(default)]
        field: Option<String>,
    },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiUpdateConfig {
    pub kpi_id: String,
    pub source: ValueSource,
    /// Overrides the KPI's own thresholds when set.
    #[serde(default)]
    pub threshold: Option<ThresholdConfig>,
    #[serde(default = "default_true")]
    pub keep_history: bool,
}
