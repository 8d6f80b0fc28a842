//! Structural change detection for published graphs. Positions are not part
//! of the signature; position-only changes go through the drag and history
//! paths instead.

use crate::graph::Graph;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralSignature {
    pub node_ids: String,
    pub edge_ids: String,
    pub counts: String,
}

impl StructuralSignature {
    pub fn of(graph: &Graph) -> Self {
        let mut node_ids: Vec<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
        let mut edge_ids: Vec<&str> = graph.edges.iter().map(|edge| edge.id.as_str()).collect();
        node_ids.sort_unstable();
        edge_ids.sort_unstable();
        Self {
            node_ids: node_ids.join(","),
            edge_ids: edge_ids.join(","),
            counts: format!("{}:{}", graph.nodes.len(), graph.edges.len()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiffGate {
    last: Option<StructuralSignature>,
}

impl DiffGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and remembers the signature when `graph` differs in shape
    /// from the last published graph, or when nothing was published yet.
    pub fn should_publish(&mut self, graph: &Graph) -> bool {
        let signature = StructuralSignature::of(graph);
        if self.last.as_ref() == Some(&signature) {
            return false;
        }
        self.last = Some(signature);
        true
    }

    pub fn last(&self) -> Option<&StructuralSignature> {
        self.last.as_ref()
    }
}
