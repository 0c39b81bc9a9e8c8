use super::ProcessGraph;
use crate::error::GraphValidationError;
use ahash::{AHashMap, AHashSet};

/// Checks the structural invariants of a graph. Has no side effects.
pub fn validate(graph: &ProcessGraph) -> Result<(), GraphValidationError> {
    if graph.nodes.is_empty() {
        return Err(GraphValidationError::EmptyGraph {
            graph_id: graph.id.clone(),
        });
    }

    let mut seen = AHashSet::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(GraphValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }

    let branches: AHashMap<&str, Option<Vec<String>>> = graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.config.declared_branches()))
        .collect();

    for edge in &graph.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !branches.contains_key(endpoint.as_str()) {
                return Err(GraphValidationError::DanglingEdge {
                    source_id: edge.source.clone(),
                    target_id: edge.target.clone(),
                    missing_node_id: endpoint.clone(),
                });
            }
        }

        let declared = branches
            .get(edge.source.as_str())
            .and_then(|branches| branches.as_ref());
        match (declared, &edge.handle) {
            (Some(declared), Some(handle)) if !declared.contains(handle) => {
                return Err(GraphValidationError::UnknownBranchHandle {
                    source_id: edge.source.clone(),
                    target_id: edge.target.clone(),
                    handle: handle.clone(),
                    declared: declared.clone(),
                });
            }
            (Some(_), None) => {
                return Err(GraphValidationError::MissingBranchHandle {
                    source_id: edge.source.clone(),
                    target_id: edge.target.clone(),
                });
            }
            (None, Some(handle)) => {
                return Err(GraphValidationError::UnexpectedBranchHandle {
                    source_id: edge.source.clone(),
                    target_id: edge.target.clone(),
                    handle: handle.clone(),
                });
            }
            _ => {}
        }
    }

    Ok(())
}
