use std::collections::{BTreeMap, HashSet};

use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};

use crate::ir::Position;

use super::{Direction, LayoutEdge, LayoutNode, LayoutOptions, LayoutProvider};

/// `LayoutProvider` backed by the dagre port.
#[derive(Debug, Clone, Copy, Default)]
pub struct DagreLayout;

impl LayoutProvider for DagreLayout {
    fn layout(
        &self,
        nodes: &[LayoutNode],
        edges: &[LayoutEdge],
        options: &LayoutOptions,
    ) -> BTreeMap<String, Position> {
        let mut positions = BTreeMap::new();
        if nodes.is_empty() {
            return positions;
        }

        let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
            DagreGraph::new(Some(GraphOption {
                directed: Some(true),
                multigraph: Some(false),
                compound: Some(false),
            }));

        let mut graph_config = DagreConfig::default();
        graph_config.rankdir = Some(dagre_rankdir(options.direction).to_string());
        graph_config.nodesep = Some(options.node_sep);
        graph_config.ranksep = Some(options.rank_sep);
        graph_config.marginx = Some(options.margin);
        graph_config.marginy = Some(options.margin);
        dagre_graph.set_graph(graph_config);

        for layout in nodes {
            let mut node = DagreNode::default();
            node.width = layout.width;
            node.height = layout.height;
            dagre_graph.set_node(layout.id.clone(), Some(node));
        }

        let node_set: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
        let mut edge_set: HashSet<(&str, &str)> = HashSet::new();
        for edge in edges {
            if !node_set.contains(edge.from.as_str()) || !node_set.contains(edge.to.as_str()) {
                continue;
            }
            // one edge per ordered pair, no self loops
            if edge.from == edge.to || !edge_set.insert((edge.from.as_str(), edge.to.as_str())) {
                continue;
            }
            let edge_label = DagreEdge::default();
            let _ = dagre_graph.set_edge(&edge.from, &edge.to, Some(edge_label), None);
        }

        dagre_layout::run_layout(&mut dagre_graph);

        for layout in nodes {
            let Some(dagre_node) = dagre_graph.node(&layout.id) else {
                continue;
            };
            positions.insert(
                layout.id.clone(),
                Position::new(
                    dagre_node.x - layout.width / 2.0,
                    dagre_node.y - layout.height / 2.0,
                ),
            );
        }

        positions
    }
}

fn dagre_rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::TopBottom => "tb",
        Direction::BottomTop => "bt",
        Direction::LeftRight => "lr",
        Direction::RightLeft => "rl",
    }
}
