use crate::config::CyclePolicy;
use crate::error::EngineError;
use crate::graph::{Node, ProcessGraph};
use ahash::AHashMap;
use std::collections::VecDeque;
use tracing::warn;

/// Orders the graph's nodes so every node comes after its predecessors.
///
/// Ready nodes are taken in their original list order and successors are released in
/// edge order, so the result is deterministic for a given graph document. Nodes left
/// over by a cycle are rejected or appended depending on `policy`.
pub fn execution_order(
    graph: &ProcessGraph,
    policy: CyclePolicy,
) -> Result<Vec<&Node>, EngineError> {
    let mut in_degree: AHashMap<&str, usize> =
        graph.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    let mut successors: AHashMap<&str, Vec<&str>> = AHashMap::new();
    for edge in &graph.edges {
        if let Some(degree) = in_degree.get_mut(edge.target.as_str()) {
            *degree += 1;
        }
        successors
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let by_id: AHashMap<&str, &Node> = graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut queue: VecDeque<&str> = graph
        .nodes
        .iter()
        .filter(|n| in_degree.get(n.id.as_str()) == Some(&0))
        .map(|n| n.id.as_str())
        .collect();

    let mut order: Vec<&Node> = Vec::with_capacity(graph.nodes.len());
    while let Some(id) = queue.pop_front() {
        if let Some(&node) = by_id.get(id) {
            order.push(node);
        }
        for &next in successors.get(id).map(Vec::as_slice).unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    if order.len() == graph.nodes.len() {
        return Ok(order);
    }

    let remaining: Vec<&Node> = graph
        .nodes
        .iter()
        .filter(|n| in_degree.get(n.id.as_str()).is_some_and(|d| *d > 0))
        .collect();
    match policy {
        CyclePolicy::Fail => Err(EngineError::CycleDetected {
            nodes: remaining.iter().map(|n| n.id.clone()).collect(),
        }),
        CyclePolicy::Append => {
            warn!(
                graph_id = %graph.id,
                nodes = remaining.len(),
                "graph contains a cycle; appending unordered nodes"
            );
            order.extend(remaining);
            Ok(order)
        }
    }
}
