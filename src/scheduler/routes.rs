use crate::executor::Routing;
use crate::graph::{Edge, ProcessGraph};
use ahash::AHashMap;

#[derive(Debug)]
enum SourceState {
    Succeeded(Routing),
    Failed,
    Skipped,
}

/// Tracks which edges are live as nodes finish.
///
/// A node with no incoming edges is always live; otherwise it needs at least one live
/// incoming edge. An edge from a failed source stays live only if it carries no handle,
/// and edges from skipped sources are dead.
#[derive(Debug)]
pub(crate) struct RouteTable<'g> {
    incoming: AHashMap<&'g str, Vec<&'g Edge>>,
    states: AHashMap<&'g str, SourceState>,
    /// Edges whose source has not run yet count as live. Only reachable with cycles.
    permissive: bool,
}

impl<'g> RouteTable<'g> {
    pub(crate) fn new(graph: &'g ProcessGraph, permissive: bool) -> Self {
        let mut incoming: AHashMap<&'g str, Vec<&'g Edge>> = AHashMap::new();
        for edge in &graph.edges {
            incoming.entry(edge.target.as_str()).or_default().push(edge);
        }
        Self {
            incoming,
            states: AHashMap::new(),
            permissive,
        }
    }

    pub(crate) fn is_live(&self, node_id: &str) -> bool {
        match self.incoming.get(node_id) {
            None => true,
            Some(edges) => edges.iter().any(|edge| self.edge_is_live(edge)),
        }
    }

    fn edge_is_live(&self, edge: &Edge) -> bool {
        match self.states.get(edge.source.as_str()) {
            Some(SourceState::Succeeded(routing)) => routing.admits(edge.handle.as_deref()),
            Some(SourceState::Failed) => edge.handle.is_none(),
            Some(SourceState::Skipped) => false,
            None => self.permissive,
        }
    }

    pub(crate) fn succeeded(&mut self, node_id: &'g str, routing: Routing) {
        self.states.insert(node_id, SourceState::Succeeded(routing));
    }

    pub(crate) fn failed(&mut self, node_id: &'g str) {
        self.states.insert(node_id, SourceState::Failed);
    }

    pub(crate) fn skipped(&mut self, node_id: &'g str) {
        self.states.insert(node_id, SourceState::Skipped);
    }
}
