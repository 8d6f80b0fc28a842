use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::LayoutConfig;
use crate::ir::Position;
use crate::layout::junction_position;

use super::classify::Classification;
use super::types::{Edge, EdgeKind, Handle, JUNCTION_PREFIX, JunctionNode, Node, NodeKind};

/// Order-independent identity of a couple: both member ids sorted and joined
/// with `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoupleKey(String);

impl CoupleKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(format!("{a}-{b}"))
        } else {
            Self(format!("{b}-{a}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn junction_id(&self) -> String {
        format!("{JUNCTION_PREFIX}{}", self.0)
    }
}

impl fmt::Display for CoupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct JunctionSynthesis {
    pub junctions: Vec<Node>,
    pub edges: Vec<Edge>,
    /// `(from, to)` parent/child pairs absorbed into a junction.
    pub handled_pairs: HashSet<(String, String)>,
    /// Couples whose marriage edge is absorbed into a junction.
    pub handled_couples: HashSet<CoupleKey>,
}

impl JunctionSynthesis {
    pub fn absorbs_pair(&self, from: &str, to: &str) -> bool {
        self.handled_pairs
            .contains(&(from.to_string(), to.to_string()))
    }

    pub fn absorbs_couple(&self, a: &str, b: &str) -> bool {
        self.handled_couples.contains(&CoupleKey::new(a, b))
    }
}

pub fn junction_edge_id(source: &str, target: &str) -> String {
    format!("{source}->{target}")
}

pub fn synthesize_junctions(
    classes: &Classification,
    positions: &HashMap<String, Position>,
    config: &LayoutConfig,
) -> JunctionSynthesis {
    let mut out = JunctionSynthesis::default();
    let mut processed: HashSet<CoupleKey> = HashSet::new();

    for (parent1, links) in &classes.parent_children {
        for parent2 in classes.spouses(parent1) {
            let key = CoupleKey::new(parent1, parent2);
            if !processed.insert(key.clone()) {
                continue;
            }

            let partner_children: HashSet<&str> = classes
                .children(parent2)
                .iter()
                .map(|link| link.target.as_str())
                .collect();
            let mut seen: HashSet<&str> = HashSet::new();
            let shared: Vec<&str> = links
                .iter()
                .map(|link| link.target.as_str())
                .filter(|target| partner_children.contains(target) && seen.insert(*target))
                .collect();
            if shared.is_empty() {
                continue;
            }

            let junction_id = key.junction_id();
            let p1 = positions.get(parent1).copied().unwrap_or_default();
            let p2 = positions.get(parent2).copied().unwrap_or_default();
            out.junctions.push(Node {
                id: junction_id.clone(),
                kind: NodeKind::Junction(JunctionNode {
                    parent1: parent1.clone(),
                    parent2: parent2.clone(),
                }),
                position: junction_position(p1, p2, config.junction_offset()),
                width: config.junction_size,
                height: config.junction_size,
            });

            out.edges.push(junction_edge(parent1, &junction_id, Handle::Right, Handle::Left));
            out.edges.push(junction_edge(parent2, &junction_id, Handle::Left, Handle::Right));
            for child in &shared {
                out.edges.push(junction_edge(&junction_id, child, Handle::Bottom, Handle::Top));
                out.handled_pairs
                    .insert((parent1.clone(), child.to_string()));
                out.handled_pairs
                    .insert((parent2.clone(), child.to_string()));
            }
            out.handled_couples.insert(key);
        }
    }

    out
}

fn junction_edge(source: &str, target: &str, source_handle: Handle, target_handle: Handle) -> Edge {
    Edge {
        id: junction_edge_id(source, target),
        source: source.to_string(),
        target: target.to_string(),
        source_handle,
        target_handle,
        kind: EdgeKind::Junction,
        relationship: None,
        label: None,
    }
}
