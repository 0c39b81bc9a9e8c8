//! Common test utilities for building process graphs and running them.
use procflow::prelude::*;
use serde_json::{Value, json};

#[allow(dead_code)]
pub fn run(graph: &ProcessGraph, ctx: ExecutionContext) -> ProcessExecution {
    tokio_test::block_on(ProcessEngine::new().execute(graph, ctx)).expect("run should start")
}

#[allow(dead_code)]
pub fn run_with(
    engine: &ProcessEngine,
    graph: &ProcessGraph,
    ctx: ExecutionContext,
) -> ProcessExecution {
    tokio_test::block_on(engine.execute(graph, ctx)).expect("run should start")
}

#[allow(dead_code)]
pub fn csv_node(id: &str, rows: Value) -> Node {
    let rows = rows
        .as_array()
        .expect("rows must be an array")
        .iter()
        .map(|row| row.as_object().expect("rows must be objects").clone())
        .collect();
    Node::new(
        id,
        NodeConfig::SourceCsv(SourceCsvConfig {
            file_name: None,
            delimiter: None,
            columns: vec![],
            rows,
        }),
    )
}

#[allow(dead_code)]
pub fn formula_node(id: &str, expression: &str) -> Node {
    Node::new(
        id,
        NodeConfig::Formula(FormulaConfig {
            expression: expression.to_string(),
            precision: None,
        }),
    )
}

#[allow(dead_code)]
pub fn conditional_node(id: &str, variable: &str, operator: ComparisonOperator, value: Value) -> Node {
    Node::new(
        id,
        NodeConfig::Conditional(ConditionalConfig {
            variable: variable.to_string(),
            operator,
            value,
            value_type: ValueType::Auto,
        }),
    )
}

#[allow(dead_code)]
pub fn state_node(id: &str, state: StateKind, message: &str) -> Node {
    Node::new(
        id,
        NodeConfig::StateChange(StateChangeConfig {
            state,
            message: message.to_string(),
            next_action: NextAction::Continue,
        }),
    )
}

#[allow(dead_code)]
pub fn stop_node(id: &str, state: StateKind, next_action: NextAction) -> Node {
    Node::new(
        id,
        NodeConfig::StateChange(StateChangeConfig {
            state,
            message: String::new(),
            next_action,
        }),
    )
}

#[allow(dead_code)]
pub fn fanout_node(id: &str, strategy: FanoutStrategy, branches: &[(&str, Option<i32>)]) -> Node {
    Node::new(
        id,
        NodeConfig::BranchFanout(BranchFanoutConfig {
            branch_count: None,
            strategy,
            branches: branches
                .iter()
                .map(|(branch, priority)| BranchSpec {
                    id: branch.to_string(),
                    label: None,
                    priority: *priority,
                })
                .collect(),
        }),
    )
}

#[allow(dead_code)]
pub fn kpi_node(id: &str, kpi_id: &str, source: ValueSource) -> Node {
    Node::new(
        id,
        NodeConfig::KpiUpdate(KpiUpdateConfig {
            kpi_id: kpi_id.to_string(),
            source,
            threshold: None,
            keep_history: true,
        }),
    )
}

#[allow(dead_code)]
pub fn kpi(id: &str, warning: f64, critical: f64, direction: ThresholdDirection) -> KpiDefinition {
    KpiDefinition {
        id: id.to_string(),
        name: id.to_string(),
        unit: "%".to_string(),
        target: 50.0,
        current: 0.0,
        history: vec![],
        threshold: ThresholdConfig {
            warning,
            critical,
            direction,
        },
    }
}

/// The reference scenario: a dataset with one amount, a 10% fee, and a check on the fee
/// that routes to one of two state markers.
///
/// `source -> fee -> check -(true)-> high`, `check -(false)-> low`
#[allow(dead_code)]
pub fn create_fee_graph(amount: f64) -> ProcessGraph {
    ProcessGraph::new(
        "fee-check",
        vec![
            csv_node("source", json!([{ "amount": amount }])),
            formula_node("fee", "amount * 0.1"),
            conditional_node("check", "fee", ComparisonOperator::GreaterThan, json!(5)),
            state_node("high", StateKind::Warning, "fee {{fee}} is above the limit"),
            state_node("low", StateKind::Success, "fee {{fee}} is fine"),
        ],
        vec![
            Edge::new("source", "fee"),
            Edge::new("fee", "check"),
            Edge::branch("check", "true", "high"),
            Edge::branch("check", "false", "low"),
        ],
    )
}

/// The same scenario as a JSON document.
#[allow(dead_code)]
pub const FEE_GRAPH_JSON: &str = r#"{
  "id": "fee-check",
  "name": "Fee check",
  "nodes": [
    { "id": "source", "label": "Orders", "type": "source-csv",
      "config": { "columns": ["amount"], "rows": [{ "amount": 100 }] } },
    { "id": "fee", "label": "Fee", "type": "formula",
      "config": { "expression": "amount * 0.1", "precision": 2 } },
    { "id": "check", "label": "Fee above 5?", "type": "conditional",
      "config": { "variable": "fee", "operator": ">", "value": 5, "valueType": "number" } },
    { "id": "high", "label": "High fee", "type": "state-change",
      "config": { "state": "warning", "message": "fee {{fee}} is above the limit" } },
    { "id": "low", "label": "Low fee", "type": "state-change",
      "config": { "state": "success", "message": "fee {{fee}} is fine" } }
  ],
  "edges": [
    { "source": "source", "target": "fee" },
    { "source": "fee", "target": "check" },
    { "source": "check", "target": "high", "sourceHandle": "true" },
    { "source": "check", "target": "low", "handle": "false" }
  ]
}"#;
