//! Graph model tests: validation rules and document round-trips.
mod common;
use common::*;
use procflow::prelude::*;
use serde_json::json;

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_reference_graph_is_valid() {
        assert_eq!(validate(&create_fee_graph(100.0)), Ok(()));
    }

    #[test]
    fn test_empty_graph_is_rejected() {
        let graph = ProcessGraph::new("empty", vec![], vec![]);
        assert_eq!(
            validate(&graph),
            Err(GraphValidationError::EmptyGraph {
                graph_id: "empty".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_node_id_is_rejected() {
        let graph = ProcessGraph::new(
            "dup",
            vec![formula_node("a", "1"), formula_node("a", "2")],
            vec![],
        );
        assert!(matches!(
            validate(&graph),
            Err(GraphValidationError::DuplicateNodeId { node_id }) if node_id == "a"
        ));
    }

    #[test]
    fn test_dangling_edge_is_rejected_before_execution() {
        let graph = ProcessGraph::new(
            "dangling",
            vec![formula_node("a", "1")],
            vec![Edge::new("a", "ghost")],
        );
        let err = validate(&graph).unwrap_err();
        assert!(matches!(
            &err,
            GraphValidationError::DanglingEdge { missing_node_id, .. } if missing_node_id == "ghost"
        ));

        let mut progress_calls = 0;
        let options = RunOptions::new().on_progress(|_| progress_calls += 1);
        let result = tokio_test::block_on(ProcessEngine::new().execute_with(
            &graph,
            ExecutionContext::new(),
            options,
        ));
        assert_eq!(result.unwrap_err(), EngineError::Validation(err));
        assert_eq!(progress_calls, 0, "no node may run on an invalid graph");
    }

    #[test]
    fn test_unknown_branch_handle_is_rejected() {
        let graph = ProcessGraph::new(
            "bad-handle",
            vec![
                conditional_node("check", "x", ComparisonOperator::Equal, json!(1)),
                formula_node("next", "1"),
            ],
            vec![Edge::branch("check", "maybe", "next")],
        );
        match validate(&graph) {
            Err(GraphValidationError::UnknownBranchHandle {
                handle, declared, ..
            }) => {
                assert_eq!(handle, "maybe");
                assert_eq!(declared, vec!["true".to_string(), "false".to_string()]);
            }
            other => panic!("expected UnknownBranchHandle, got {:?}", other),
        }
    }

    #[test]
    fn test_fanout_edges_must_name_declared_branches() {
        let fanout = fanout_node("split", FanoutStrategy::Parallel, &[("a", None), ("b", None)]);
        let valid = ProcessGraph::new(
            "fanout",
            vec![fanout.clone(), formula_node("x", "1")],
            vec![Edge::branch("split", "b", "x")],
        );
        assert_eq!(validate(&valid), Ok(()));

        let missing = ProcessGraph::new(
            "fanout",
            vec![fanout, formula_node("x", "1")],
            vec![Edge::new("split", "x")],
        );
        assert!(matches!(
            validate(&missing),
            Err(GraphValidationError::MissingBranchHandle { .. })
        ));
    }

    #[test]
    fn test_handle_on_plain_node_is_rejected() {
        let graph = ProcessGraph::new(
            "plain",
            vec![formula_node("a", "1"), formula_node("b", "2")],
            vec![Edge::branch("a", "true", "b")],
        );
        assert!(matches!(
            validate(&graph),
            Err(GraphValidationError::UnexpectedBranchHandle { handle, .. }) if handle == "true"
        ));
    }

    #[test]
    fn test_into_validated_graph_checks_structure() {
        struct Outline(Vec<&'static str>);

        impl IntoGraph for Outline {
            fn into_graph(self) -> ProcessGraph {
                let nodes = self.0.iter().map(|id| formula_node(id, "1")).collect();
                let edges = self.0.windows(2).map(|w| Edge::new(w[0], w[1])).collect();
                ProcessGraph::new("outline", nodes, edges)
            }
        }

        let graph = Outline(vec!["a", "b", "c"]).into_validated_graph().unwrap();
        assert_eq!(graph.edges.len(), 2);
        assert!(Outline(vec![]).into_validated_graph().is_err());
    }
}

#[cfg(test)]
mod document_tests {
    use super::*;

    #[test]
    fn test_graph_document_parses_every_field() {
        let graph = ProcessGraph::from_json(FEE_GRAPH_JSON).unwrap();
        assert_eq!(graph.name.as_deref(), Some("Fee check"));
        assert_eq!(graph.nodes.len(), 5);
        assert_eq!(graph.node("check").unwrap().kind(), NodeKind::Conditional);
        assert_eq!(graph.edges[2].handle.as_deref(), Some("true"));
        assert_eq!(graph.edges[3].handle.as_deref(), Some("false"));

        match &graph.node("check").unwrap().config {
            NodeConfig::Conditional(config) => {
                assert_eq!(config.operator, ComparisonOperator::GreaterThan);
                assert_eq!(config.value_type, ValueType::Number);
            }
            other => panic!("unexpected config {:?}", other),
        }
        match &graph.node("high").unwrap().config {
            NodeConfig::StateChange(config) => assert_eq!(config.next_action, NextAction::Continue),
            other => panic!("unexpected config {:?}", other),
        }
    }

    #[test]
    fn test_graph_document_round_trips() {
        let mut graph = ProcessGraph::from_json(FEE_GRAPH_JSON).unwrap();
        graph.kpis = vec![kpi("fee-rate", 70.0, 90.0, ThresholdDirection::AboveTriggers)];
        graph.nodes.push(
            kpi_node(
                "track",
                "fee-rate",
                ValueSource::UpstreamNode {
                    node_id: "fee".to_string(),
                    field: None,
                },
            )
            .output_to("tracked")
            .on_error(FailurePolicy::Fail),
        );

        let json = graph.to_json().unwrap();
        let reparsed = ProcessGraph::from_json(&json).unwrap();
        assert_eq!(reparsed, graph);
    }

    #[test]
    fn test_graph_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, FEE_GRAPH_JSON).unwrap();

        let graph = ProcessGraph::from_file(&path).unwrap();
        assert_eq!(graph.id, "fee-check");

        let missing = ProcessGraph::from_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(DocumentError::Io { .. })));
    }

    #[test]
    fn test_unknown_node_type_is_a_parse_error() {
        let json = r#"{ "id": "g", "nodes": [{ "id": "a", "type": "teleport", "config": {} }] }"#;
        assert!(matches!(
            ProcessGraph::from_json(json),
            Err(DocumentError::Json(_))
        ));
    }
}
