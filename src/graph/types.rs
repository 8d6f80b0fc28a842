use crate::ir::{DisplayIdentity, Position, RelationshipKind};
use serde::Serialize;

pub const JUNCTION_PREFIX: &str = "junction-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Orthogonal edge routed through a couple junction.
    Junction,
    Relationship,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JunctionNode {
    pub parent1: String,
    pub parent2: String,
}

impl JunctionNode {
    pub fn touches(&self, member_id: &str) -> bool {
        self.parent1 == member_id || self.parent2 == member_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Member(DisplayIdentity),
    Junction(JunctionNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub position: Position,
    pub width: f32,
    pub height: f32,
}

impl Node {
    pub fn is_junction(&self) -> bool {
        matches!(self.kind, NodeKind::Junction(_))
    }

    pub fn junction(&self) -> Option<&JunctionNode> {
        match &self.kind {
            NodeKind::Junction(junction) => Some(junction),
            NodeKind::Member(_) => None,
        }
    }

    pub fn selectable(&self) -> bool {
        !self.is_junction()
    }

    pub fn draggable(&self) -> bool {
        !self.is_junction()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: Handle,
    pub target_handle: Handle,
    pub kind: EdgeKind,
    pub relationship: Option<RelationshipKind>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.node(id).map(|node| node.position)
    }

    pub fn junctions(&self) -> impl Iterator<Item = (&Node, &JunctionNode)> {
        self.nodes
            .iter()
            .filter_map(|node| node.junction().map(|junction| (node, junction)))
    }

    pub fn members(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| !node.is_junction())
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id == id)
    }
}
