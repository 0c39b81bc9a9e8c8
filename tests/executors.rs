//! Executor tests: each node type run in isolation against a prepared context.
mod common;
use chrono::Utc;
use common::*;
use procflow::collaborator::{EchoCompletion, InMemoryAssets, WeightedSumModel};
use procflow::executor::{Directive, ExecutorRegistry, compare_values};
use procflow::kpi::KpiBook;
use procflow::prelude::*;
use procflow::template;
use serde_json::{Value, json};
use std::sync::Arc;

fn dispatch_with(
    node: &Node,
    ctx: &ExecutionContext,
    collaborators: &Collaborators,
) -> std::result::Result<NodeOutcome, NodeExecutionError> {
    let graph = ProcessGraph::new("executor-test", vec![node.clone()], vec![]);
    let kpis = KpiBook::default();
    let config = EngineConfig::default();
    let env = NodeEnv {
        graph: &graph,
        context: ctx,
        kpis: &kpis,
        collaborators,
        config: &config,
        now: Utc::now(),
    };
    tokio_test::block_on(ExecutorRegistry::with_defaults().dispatch(node, &env))
}

fn dispatch(node: &Node, ctx: &ExecutionContext) -> std::result::Result<NodeOutcome, NodeExecutionError> {
    dispatch_with(node, ctx, &Collaborators::default())
}

fn transform(operation: TransformOperation) -> Node {
    Node::new(
        "transform",
        NodeConfig::Transform(TransformConfig {
            input: None,
            operation,
        }),
    )
}

fn orders() -> ExecutionContext {
    ExecutionContext::new().with(
        "orders",
        json!({
            "columns": ["region", "amount"],
            "rows": [
                { "region": "north", "amount": 120 },
                { "region": "south", "amount": 40 },
                { "region": "north", "amount": 80 },
            ]
        }),
    )
}

#[cfg(test)]
mod source_tests {
    use super::*;

    #[test]
    fn test_inline_rows_infer_columns() {
        let node = csv_node("source", json!([{ "amount": 100 }, { "amount": 5, "note": "x" }]));
        let outcome = dispatch(&node, &ExecutionContext::new()).unwrap();
        assert_eq!(outcome.value["columns"], json!(["amount", "note"]));
        assert_eq!(outcome.value["rows"][0]["amount"], json!(100));
    }

    #[test]
    fn test_delimited_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        std::fs::write(
            &path,
            "id;customer;amount;paid\n1;\"Smith; John\";12.5;true\n2;\"The \"\"Big\"\" One\";7;false\n",
        )
        .unwrap();

        let node = Node::new(
            "source",
            NodeConfig::SourceCsv(SourceCsvConfig {
                file_name: Some(path.display().to_string()),
                delimiter: Some(';'),
                columns: vec![],
                rows: vec![],
            }),
        );
        let outcome = dispatch(&node, &ExecutionContext::new()).unwrap();
        assert_eq!(outcome.value["columns"], json!(["id", "customer", "amount", "paid"]));
        assert_eq!(
            outcome.value["rows"],
            json!([
                { "id": 1.0, "customer": "Smith; John", "amount": 12.5, "paid": true },
                { "id": 2.0, "customer": "The \"Big\" One", "amount": 7.0, "paid": false },
            ])
        );
    }

    #[test]
    fn test_ragged_file_is_a_dataset_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b\n1,2,3\n").unwrap();
        let node = Node::new(
            "source",
            NodeConfig::SourceCsv(SourceCsvConfig {
                file_name: Some(path.display().to_string()),
                ..Default::default()
            }),
        );
        assert!(matches!(
            dispatch(&node, &ExecutionContext::new()),
            Err(NodeExecutionError::Dataset(_))
        ));
    }

    #[test]
    fn test_asset_without_catalog_echoes_config() {
        let node = Node::new(
            "asset",
            NodeConfig::SourceAsset(SourceAssetConfig {
                asset_id: "pump-7".to_string(),
                criticality: Some(Criticality::High),
                fields: vec![],
            }),
        );
        let outcome = dispatch(&node, &ExecutionContext::new()).unwrap();
        assert_eq!(outcome.value, json!({ "id": "pump-7", "criticality": "high" }));
    }

    #[test]
    fn test_asset_from_catalog_is_projected() {
        let mut fields = serde_json::Map::new();
        fields.insert("id".to_string(), json!("pump-7"));
        fields.insert("site".to_string(), json!("Plant A"));
        fields.insert("hours".to_string(), json!(5400));
        let collaborators = Collaborators::default()
            .with_assets(Arc::new(InMemoryAssets::new().with_asset("pump-7", fields)));

        let node = Node::new(
            "asset",
            NodeConfig::SourceAsset(SourceAssetConfig {
                asset_id: "pump-7".to_string(),
                criticality: None,
                fields: vec!["site".to_string(), "hours".to_string()],
            }),
        );
        let outcome = dispatch_with(&node, &ExecutionContext::new(), &collaborators).unwrap();
        assert_eq!(outcome.value, json!({ "site": "Plant A", "hours": 5400 }));

        let missing = Node::new(
            "asset",
            NodeConfig::SourceAsset(SourceAssetConfig {
                asset_id: "pump-8".to_string(),
                criticality: None,
                fields: vec![],
            }),
        );
        assert!(matches!(
            dispatch_with(&missing, &ExecutionContext::new(), &collaborators),
            Err(NodeExecutionError::EntityNotFound { entity_id, .. }) if entity_id == "pump-8"
        ));
    }
}

#[cfg(test)]
mod transform_tests {
    use super::*;

    #[test]
    fn test_map_computes_a_field_per_row() {
        let ctx = orders().with("rate", json!(0.1));
        let node = transform(TransformOperation::Map {
            target: "fee".to_string(),
            formula: "amount * rate".to_string(),
        });
        let outcome = dispatch(&node, &ctx).unwrap();
        let fees: Vec<&Value> = outcome.value.as_array().unwrap().iter().map(|r| &r["fee"]).collect();
        assert_eq!(fees, vec![&json!(12.0), &json!(4.0), &json!(8.0)]);
    }

    #[test]
    fn test_filter_keeps_matching_rows() {
        let node = transform(TransformOperation::Filter {
            field: "amount".to_string(),
            operator: ComparisonOperator::GreaterThanOrEqual,
            value: json!(80),
        });
        let outcome = dispatch(&node, &orders()).unwrap();
        assert_eq!(outcome.value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_aggregate_with_and_without_groups() {
        let total = transform(TransformOperation::Aggregate {
            field: "amount".to_string(),
            function: AggregateFunction::Sum,
            group_by: None,
        });
        assert_eq!(dispatch(&total, &orders()).unwrap().value, json!({ "amount": 240.0 }));

        let by_region = transform(TransformOperation::Aggregate {
            field: "amount".to_string(),
            function: AggregateFunction::Avg,
            group_by: Some("region".to_string()),
        });
        assert_eq!(
            dispatch(&by_region, &orders()).unwrap().value,
            json!({ "north": 100.0, "south": 40.0 })
        );

        let count = transform(TransformOperation::Aggregate {
            field: "amount".to_string(),
            function: AggregateFunction::Count,
            group_by: None,
        });
        assert_eq!(dispatch(&count, &orders()).unwrap().value, json!({ "amount": 3 }));
    }

    #[test]
    fn test_sort_descending() {
        let node = transform(TransformOperation::Sort {
            field: "amount".to_string(),
            descending: true,
        });
        let outcome = dispatch(&node, &orders()).unwrap();
        let amounts: Vec<&Value> = outcome.value.as_array().unwrap().iter().map(|r| &r["amount"]).collect();
        assert_eq!(amounts, vec![&json!(120), &json!(80), &json!(40)]);
    }

    #[test]
    fn test_enrich_uses_the_most_recent_collection() {
        let ctx = orders().with("flags", json!([{ "code": "a" }]));
        let mut fields = serde_json::Map::new();
        fields.insert("checked".to_string(), json!(true));
        let node = transform(TransformOperation::Enrich { fields });
        let outcome = dispatch(&node, &ctx).unwrap();
        assert_eq!(outcome.value, json!([{ "code": "a", "checked": true }]));
    }

    #[test]
    fn test_named_input_must_be_a_collection() {
        let ctx = orders().with("total", json!(240));
        let node = Node::new(
            "transform",
            NodeConfig::Transform(TransformConfig {
                input: Some("total".to_string()),
                operation: TransformOperation::Sort {
                    field: "amount".to_string(),
                    descending: false,
                },
            }),
        );
        assert!(matches!(
            dispatch(&node, &ctx),
            Err(NodeExecutionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_no_collection_in_context() {
        let node = transform(TransformOperation::Sort {
            field: "amount".to_string(),
            descending: false,
        });
        assert!(matches!(
            dispatch(&node, &ExecutionContext::new().with("x", json!(1))),
            Err(NodeExecutionError::MissingVariable { .. })
        ));
    }
}

#[cfg(test)]
mod conditional_tests {
    use super::*;

    #[test]
    fn test_selects_true_or_false_branch() {
        let node = conditional_node("check", "fee", ComparisonOperator::GreaterThan, json!(5));
        let high = dispatch(&node, &ExecutionContext::new().with("fee", json!(10))).unwrap();
        assert_eq!(high.value, json!({ "result": true, "selectedBranch": "true" }));
        assert_eq!(high.routing, Routing::Branches(vec!["true".to_string()]));

        let low = dispatch(&node, &ExecutionContext::new().with("fee", json!(2))).unwrap();
        assert_eq!(low.value["selectedBranch"], json!("false"));
        assert!(!low.routing.admits(Some("true")));
        assert!(low.routing.admits(None));
    }

    #[test]
    fn test_missing_variable_fails() {
        let node = conditional_node("check", "fee", ComparisonOperator::Equal, json!(1));
        assert!(matches!(
            dispatch(&node, &ExecutionContext::new()),
            Err(NodeExecutionError::MissingVariable { name }) if name == "fee"
        ));
    }

    #[test]
    fn test_coercion_by_value_type() {
        assert!(compare_values(&json!("10"), ComparisonOperator::Equal, &json!(10), ValueType::Auto).unwrap());
        // Text comparison orders lexically.
        assert!(compare_values(&json!("10"), ComparisonOperator::LessThan, &json!("9"), ValueType::String).unwrap());
        assert!(compare_values(&json!("true"), ComparisonOperator::Equal, &json!(true), ValueType::Boolean).unwrap());
        assert!(matches!(
            compare_values(&json!("pump"), ComparisonOperator::GreaterThan, &json!(1), ValueType::Number),
            Err(NodeExecutionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            compare_values(&json!(true), ComparisonOperator::GreaterThan, &json!(false), ValueType::Boolean),
            Err(NodeExecutionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_ordering_booleans_names_the_problem() {
        match compare_values(&json!(true), ComparisonOperator::LessThan, &json!(false), ValueType::Auto) {
            Err(NodeExecutionError::TypeMismatch {
                operation,
                expected,
                found,
            }) => {
                assert_eq!(operation, "<");
                assert!(expected.contains("booleans have no ordering"), "{}", expected);
                assert_eq!(found, json!(true));
            }
            other => panic!("expected a type mismatch, got {:?}", other),
        }
        assert!(compare_values(&json!(true), ComparisonOperator::NotEqual, &json!(false), ValueType::Auto).unwrap());
    }

    #[test]
    fn test_text_operators() {
        let tags = json!(["urgent", "line-3"]);
        assert!(compare_values(&tags, ComparisonOperator::Contains, &json!("urgent"), ValueType::Auto).unwrap());
        assert!(!compare_values(&tags, ComparisonOperator::Contains, &json!("line"), ValueType::Auto).unwrap());
        assert!(compare_values(&json!("PUMP-7"), ComparisonOperator::StartsWith, &json!("PUMP"), ValueType::Auto).unwrap());
        assert!(compare_values(&json!("report.csv"), ComparisonOperator::EndsWith, &json!(".csv"), ValueType::Auto).unwrap());
    }
}

#[cfg(test)]
mod formula_node_tests {
    use super::*;

    #[test]
    fn test_result_is_rounded_to_precision() {
        let ctx = ExecutionContext::new().with("a", json!(10)).with("b", json!(3));
        let default = formula_node("ratio", "a / b");
        assert_eq!(dispatch(&default, &ctx).unwrap().value, json!(3.33));

        let precise = Node::new(
            "ratio",
            NodeConfig::Formula(FormulaConfig {
                expression: "a / b".to_string(),
                precision: Some(4),
            }),
        );
        assert_eq!(dispatch(&precise, &ctx).unwrap().value, json!(3.3333));
    }

    #[test]
    fn test_division_by_zero_is_a_node_error() {
        let ctx = ExecutionContext::new().with("n", json!(0));
        assert!(matches!(
            dispatch(&formula_node("bad", "1 / n"), &ctx),
            Err(NodeExecutionError::Formula(FormulaError::DivisionByZero { .. }))
        ));
    }
}

#[cfg(test)]
mod collaborator_tests {
    use super::*;

    fn completion_node(prompt: &str) -> Node {
        Node::new(
            "summary",
            NodeConfig::TextCompletion(TextCompletionConfig {
                prompt: prompt.to_string(),
                system: Some("You review {{site|the plant}}.".to_string()),
                model: "small".to_string(),
                temperature: Some(0.2),
                max_tokens: Some(64),
                top_p: None,
            }),
        )
    }

    #[test]
    fn test_completion_without_service_is_unavailable() {
        let ctx = ExecutionContext::new().with("asset", json!("pump-7"));
        assert_eq!(
            dispatch(&completion_node("Summarize {{asset}}"), &ctx).unwrap_err(),
            NodeExecutionError::CollaboratorUnavailable(CollaboratorError::Unconfigured {
                service: "text-completion".to_string()
            })
        );
    }

    #[test]
    fn test_completion_renders_prompt() {
        let ctx = ExecutionContext::new().with("asset", json!("pump-7"));
        let collaborators = Collaborators {
            completion: Some(Arc::new(EchoCompletion)),
            ..Default::default()
        };
        let outcome = dispatch_with(&completion_node("Summarize {{ asset }}"), &ctx, &collaborators).unwrap();
        assert_eq!(outcome.value, json!("[small] Summarize pump-7"));
    }

    #[test]
    fn test_completion_with_unresolved_placeholder() {
        let collaborators = Collaborators::mocks();
        assert!(matches!(
            dispatch_with(&completion_node("Summarize {{asset}}"), &ExecutionContext::new(), &collaborators),
            Err(NodeExecutionError::MissingVariable { name }) if name == "asset"
        ));
    }

    #[test]
    fn test_inference_scores_features() {
        let ctx = ExecutionContext::new()
            .with("temperature", json!(60))
            .with("vibration", json!("15.5"));
        let node = Node::new(
            "predict",
            NodeConfig::MlInfer(MlInferConfig {
                model_id: "wear".to_string(),
                model_kind: ModelKind::Regression,
                features: vec!["temperature".to_string(), "vibration".to_string()],
            }),
        );
        let collaborators = Collaborators {
            inference: Some(Arc::new(WeightedSumModel::default())),
            ..Default::default()
        };
        let outcome = dispatch_with(&node, &ctx, &collaborators).unwrap();
        assert_eq!(outcome.value["prediction"], json!(75.5));
        assert!(outcome.value["confidence"].as_f64().unwrap() > 0.99);

        assert!(matches!(
            dispatch(&node, &ctx),
            Err(NodeExecutionError::CollaboratorUnavailable(_))
        ));
    }
}

#[cfg(test)]
mod branching_tests {
    use super::*;

    #[test]
    fn test_fanout_strategies_select_branches() {
        let branches = [("slow", Some(2)), ("fast", Some(1)), ("spare", Some(1))];
        let selected = |strategy| {
            let node = fanout_node("split", strategy, &branches);
            dispatch(&node, &ExecutionContext::new()).unwrap().routing
        };
        let all: Vec<String> = vec!["slow".into(), "fast".into(), "spare".into()];

        assert_eq!(selected(FanoutStrategy::Parallel), Routing::Branches(all.clone()));
        assert_eq!(selected(FanoutStrategy::Sequential), Routing::Branches(all));
        assert_eq!(selected(FanoutStrategy::Priority), Routing::Branches(vec!["fast".into()]));
        assert_eq!(selected(FanoutStrategy::Race), Routing::Branches(vec!["slow".into()]));
    }

    #[test]
    fn test_fanout_output_describes_branches() {
        let node = fanout_node("split", FanoutStrategy::Race, &[("a", None), ("b", None)]);
        let outcome = dispatch(&node, &ExecutionContext::new()).unwrap();
        assert_eq!(outcome.value["strategy"], json!("race"));
        assert_eq!(outcome.value["branches"][0]["selected"], json!(true));
        assert_eq!(outcome.value["branches"][1]["selected"], json!(false));
    }

    #[test]
    fn test_state_change_directives() {
        let ctx = ExecutionContext::new().with("fee", json!(10));
        let marker = state_node("done", StateKind::Info, "fee was {{fee}}");
        let outcome = dispatch(&marker, &ctx).unwrap();
        assert_eq!(outcome.value, json!({ "state": "info", "message": "fee was 10" }));
        assert_eq!(outcome.directive, Directive::Continue);

        let stop = stop_node("stop", StateKind::Success, NextAction::Stop);
        assert_eq!(
            dispatch(&stop, &ctx).unwrap().directive,
            Directive::Halt { failed: false }
        );
        let rollback = stop_node("undo", StateKind::Warning, NextAction::Rollback);
        assert_eq!(
            dispatch(&rollback, &ctx).unwrap().directive,
            Directive::Halt { failed: true }
        );
    }

    #[test]
    fn test_unregistered_node_type() {
        let node = formula_node("f", "1");
        let graph = ProcessGraph::new("g", vec![node.clone()], vec![]);
        let ctx = ExecutionContext::new();
        let kpis = KpiBook::default();
        let config = EngineConfig::default();
        let collaborators = Collaborators::default();
        let env = NodeEnv {
            graph: &graph,
            context: &ctx,
            kpis: &kpis,
            collaborators: &collaborators,
            config: &config,
            now: Utc::now(),
        };
        let result = tokio_test::block_on(ExecutorRegistry::empty().dispatch(&node, &env));
        assert_eq!(
            result.unwrap_err(),
            NodeExecutionError::UnsupportedNode("formula".to_string())
        );
    }
}

#[cfg(test)]
mod template_tests {
    use super::*;

    #[test]
    fn test_placeholders_and_defaults() {
        let ctx = ExecutionContext::new()
            .with("asset", json!({ "name": "Pump 7", "hours": 5400 }))
            .with("owner", json!(null));
        assert_eq!(
            template::render("{{asset.name}} ran {{asset.hours}}h, owner {{owner}}, shift {{shift|day}}", &ctx)
                .unwrap(),
            "Pump 7 ran 5400h, owner null, shift day"
        );
        assert_eq!(
            template::placeholders("{{a}} and {{ b.c | x }}"),
            vec!["a".to_string(), "b.c".to_string()]
        );
        assert!(template::render("{{missing}}", &ctx).is_err());
    }
}
