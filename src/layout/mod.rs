//! Auto-layout adapter and the alignment rules the engine enforces on top of
//! whatever positions the layout provider produced.

mod align;
mod dagre;

pub use align::{align_spouses, junction_position, place_junctions, place_junctions_touching};
pub use dagre::DagreLayout;

use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::config::LayoutConfig;
use crate::graph::{Classification, Graph, NodeKind};
use crate::ir::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopBottom,
    BottomTop,
    LeftRight,
    RightLeft,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub direction: Direction,
    pub node_sep: f32,
    pub rank_sep: f32,
    pub margin: f32,
}

impl LayoutOptions {
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            direction: Direction::TopBottom,
            node_sep: config.node_spacing,
            rank_sep: config.rank_spacing,
            margin: config.margin,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: String,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutEdge {
    pub from: String,
    pub to: String,
}

/// Hierarchical layout algorithm seen as a black box: it receives member
/// boxes and edges between them and returns top-left positions. Nodes missing
/// from the result keep their previous position.
pub trait LayoutProvider {
    fn layout(
        &self,
        nodes: &[LayoutNode],
        edges: &[LayoutEdge],
        options: &LayoutOptions,
    ) -> BTreeMap<String, Position>;
}

/// Member boxes and member-to-member edges for the provider. Junction routes
/// are projected onto both parents so shared children still rank below them.
pub fn layout_inputs(graph: &Graph) -> (Vec<LayoutNode>, Vec<LayoutEdge>) {
    let nodes: Vec<LayoutNode> = graph
        .members()
        .map(|node| LayoutNode {
            id: node.id.clone(),
            width: node.width,
            height: node.height,
        })
        .collect();
    let member_ids: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();

    let mut seen: HashSet<LayoutEdge> = HashSet::new();
    let mut edges = Vec::new();
    let mut push = |from: &str, to: &str| {
        if !member_ids.contains(from) || !member_ids.contains(to) {
            return;
        }
        let edge = LayoutEdge {
            from: from.to_string(),
            to: to.to_string(),
        };
        if seen.insert(edge.clone()) {
            edges.push(edge);
        }
    };

    for edge in &graph.edges {
        match graph.node(&edge.source).map(|node| &node.kind) {
            Some(NodeKind::Junction(junction)) => {
                push(&junction.parent1, &edge.target);
                push(&junction.parent2, &edge.target);
            }
            Some(NodeKind::Member(_)) => push(&edge.source, &edge.target),
            None => {}
        }
    }

    (nodes, edges)
}

/// Runs the provider over member nodes, then aligns spouses and re-places
/// every junction from its aligned parents.
pub fn apply_auto_layout(
    graph: &mut Graph,
    classes: &Classification,
    provider: &dyn LayoutProvider,
    config: &LayoutConfig,
) {
    let (nodes, edges) = layout_inputs(graph);
    let positions = provider.layout(&nodes, &edges, &LayoutOptions::from_config(config));
    let mut applied = 0usize;
    for (id, position) in positions {
        if let Some(node) = graph.node_mut(&id) {
            if !node.is_junction() {
                node.position = position;
                applied += 1;
            }
        }
    }
    debug!(
        "auto layout applied: members={} positioned={applied} layout_edges={}",
        nodes.len(),
        edges.len()
    );

    align_spouses(graph, classes);
    place_junctions(graph, config.junction_offset());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::assemble_graph;
    use crate::ir::{DisplayIdentity, Member, Relationship, RelationshipKind};

    /// Returns the same position table regardless of input.
    struct FixedLayout(Vec<(&'static str, f32, f32)>);

    impl LayoutProvider for FixedLayout {
        fn layout(
            &self,
            _nodes: &[LayoutNode],
            _edges: &[LayoutEdge],
            _options: &LayoutOptions,
        ) -> BTreeMap<String, Position> {
            self.0
                .iter()
                .map(|(id, x, y)| (id.to_string(), Position::new(*x, *y)))
                .collect()
        }
    }

    fn family() -> (Vec<Member>, Vec<Relationship>) {
        let members = ["M1", "M2", "C1"]
            .iter()
            .map(|id| Member::new(id, DisplayIdentity::inline(id)))
            .collect();
        let rels = vec![
            Relationship::new("r1", "M1", "M2", RelationshipKind::Marriage),
            Relationship::new("r2", "M1", "C1", RelationshipKind::Parent),
            Relationship::new("r3", "M2", "C1", RelationshipKind::Parent),
        ];
        (members, rels)
    }

    #[test]
    fn junction_routes_project_onto_parents() {
        let (members, rels) = family();
        let assembly = assemble_graph(&members, &rels, &LayoutConfig::default());
        let (nodes, edges) = layout_inputs(&assembly.graph);
        assert_eq!(nodes.len(), 3);
        let pairs: Vec<_> = edges.iter().map(|e| (e.from.as_str(), e.to.as_str())).collect();
        assert_eq!(pairs, vec![("M1", "C1"), ("M2", "C1")]);
    }

    #[test]
    fn spouses_align_and_junction_centres_between_them() {
        let (members, rels) = family();
        let config = LayoutConfig::default();
        let mut assembly = assemble_graph(&members, &rels, &config);
        let provider = FixedLayout(vec![("M1", 0.0, 0.0), ("M2", 200.0, 120.0), ("C1", 100.0, 300.0)]);
        apply_auto_layout(&mut assembly.graph, &assembly.classes, &provider, &config);

        let graph = &assembly.graph;
        assert_eq!(graph.position("M1").unwrap().y, 60.0);
        assert_eq!(graph.position("M2").unwrap().y, 60.0);
        assert_eq!(graph.position("C1").unwrap(), Position::new(100.0, 300.0));
        assert_eq!(
            graph.position("junction-M1-M2").unwrap(),
            Position::new(96.0, 56.0)
        );
    }
}
