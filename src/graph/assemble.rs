use std::collections::HashMap;

use log::debug;

use crate::config::LayoutConfig;
use crate::ir::{Member, Position, Relationship, RelationshipKind};

use super::classify::{Classification, classify_relationships};
use super::couples::{JunctionSynthesis, synthesize_junctions};
use super::types::{Edge, EdgeKind, Graph, Handle, Node, NodeKind};

/// Everything derived from one data revision.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub graph: Graph,
    pub classes: Classification,
}

pub fn assemble_graph(
    members: &[Member],
    relationships: &[Relationship],
    config: &LayoutConfig,
) -> Assembly {
    let classes = classify_relationships(relationships);
    let positions: HashMap<String, Position> = members
        .iter()
        .map(|member| (member.id.clone(), member.position()))
        .collect();
    let synthesis = synthesize_junctions(&classes, &positions, config);

    let mut nodes: Vec<Node> = members
        .iter()
        .map(|member| Node {
            id: member.id.clone(),
            kind: NodeKind::Member(member.display.clone()),
            position: member.position(),
            width: config.member_width,
            height: config.member_height,
        })
        .collect();
    nodes.extend(synthesis.junctions.iter().cloned());

    let mut edges = synthesis.edges.clone();
    edges.extend(direct_edges(relationships, &synthesis));

    debug!(
        "assembled family graph: members={} junctions={} edges={}",
        members.len(),
        synthesis.junctions.len(),
        edges.len()
    );

    Assembly {
        graph: Graph { nodes, edges },
        classes,
    }
}

fn direct_edges<'a>(
    relationships: &'a [Relationship],
    synthesis: &'a JunctionSynthesis,
) -> impl Iterator<Item = Edge> + 'a {
    relationships.iter().filter_map(move |rel| {
        if rel.kind.is_parentage() && synthesis.absorbs_pair(&rel.from, &rel.to) {
            return None;
        }
        if rel.kind.is_couple() && synthesis.absorbs_couple(&rel.from, &rel.to) {
            return None;
        }
        Some(direct_edge(rel))
    })
}

fn direct_edge(rel: &Relationship) -> Edge {
    let (source_handle, target_handle) = direct_handles(&rel.kind);
    Edge {
        id: rel.id.clone(),
        source: rel.from.clone(),
        target: rel.to.clone(),
        source_handle,
        target_handle,
        kind: EdgeKind::Relationship,
        relationship: Some(rel.kind.clone()),
        label: edge_label(rel),
    }
}

fn direct_handles(kind: &RelationshipKind) -> (Handle, Handle) {
    match kind {
        RelationshipKind::Marriage | RelationshipKind::Spouse | RelationshipKind::Sibling => {
            (Handle::Right, Handle::Left)
        }
        RelationshipKind::Parent
        | RelationshipKind::Child
        | RelationshipKind::Adoption
        | RelationshipKind::Custom
        | RelationshipKind::Other(_) => (Handle::Bottom, Handle::Top),
    }
}

fn edge_label(rel: &Relationship) -> Option<String> {
    match &rel.kind {
        RelationshipKind::Parent
        | RelationshipKind::Child
        | RelationshipKind::Marriage
        | RelationshipKind::Spouse => None,
        RelationshipKind::Custom => Some(
            rel.custom_label
                .clone()
                .unwrap_or_else(|| rel.kind.to_string()),
        ),
        other => Some(other.to_string()),
    }
}
