use super::ProcessGraph;
use crate::error::GraphValidationError;

/// A trait for foreign graph documents that can be converted into a `ProcessGraph`.
///
/// Editors and importers keep their own document shape (canvas positions, styling,
/// editor-only metadata) and implement this trait to hand the engine only what it
/// executes. The converted graph is validated before it is returned by
/// [`IntoGraph::into_validated_graph`].
///
/// # Example
///
/// ```rust,no_run
/// use procflow::prelude::*;
///
/// struct CanvasNode { id: String, expression: String }
/// struct Canvas { id: String, nodes: Vec<CanvasNode> }
///
/// impl IntoGraph for Canvas {
///     fn into_graph(self) -> ProcessGraph {
///         let nodes = self
///             .nodes
///             .into_iter()
///             .map(|n| {
///                 Node::new(n.id, NodeConfig::Formula(FormulaConfig {
///                     expression: n.expression,
///                     precision: None,
///                 }))
///             })
///             .collect();
///         ProcessGraph::new(self.id, nodes, vec![])
///     }
/// }
/// ```
pub trait IntoGraph {
    /// Consumes the document and converts it into the engine's graph model.
    fn into_graph(self) -> ProcessGraph;

    /// Converts and validates in one step.
    fn into_validated_graph(self) -> Result<ProcessGraph, GraphValidationError>
    where
        Self: Sized,
    {
        self.into_graph().validated()
    }
}
