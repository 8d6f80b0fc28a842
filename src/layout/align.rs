use std::collections::HashSet;

use crate::graph::{Classification, CoupleKey, Graph, JunctionNode};
use crate::ir::Position;

/// Junction marker position for a couple: horizontally centred between the
/// parents, on the parents' line, shifted by half the marker size.
pub fn junction_position(parent1: Position, parent2: Position, offset: f32) -> Position {
    Position::new((parent1.x + parent2.x) / 2.0 - offset, parent1.y - offset)
}

/// Gives both members of every couple the mean of their y coordinates.
pub fn align_spouses(graph: &mut Graph, classes: &Classification) {
    let mut visited: HashSet<CoupleKey> = HashSet::new();
    for (a, spouses) in &classes.marriages {
        for b in spouses {
            if !visited.insert(CoupleKey::new(a, b)) {
                continue;
            }
            let (Some(pa), Some(pb)) = (graph.position(a), graph.position(b)) else {
                continue;
            };
            let avg_y = (pa.y + pb.y) / 2.0;
            for id in [a, b] {
                if let Some(node) = graph.node_mut(id) {
                    node.position.y = avg_y;
                }
            }
        }
    }
}

pub fn place_junctions(graph: &mut Graph, offset: f32) -> usize {
    place_junctions_where(graph, offset, |_| true)
}

/// Re-places only the junctions with a parent in `members`.
pub fn place_junctions_touching(graph: &mut Graph, offset: f32, members: &HashSet<String>) -> usize {
    place_junctions_where(graph, offset, |junction| {
        members.contains(&junction.parent1) || members.contains(&junction.parent2)
    })
}

fn place_junctions_where(
    graph: &mut Graph,
    offset: f32,
    filter: impl Fn(&JunctionNode) -> bool,
) -> usize {
    let updates: Vec<(String, Position)> = graph
        .junctions()
        .filter(|(_, junction)| filter(junction))
        .filter_map(|(node, junction)| {
            let p1 = graph.position(&junction.parent1)?;
            let p2 = graph.position(&junction.parent2)?;
            Some((node.id.clone(), junction_position(p1, p2, offset)))
        })
        .collect();
    let count = updates.len();
    for (id, position) in updates {
        if let Some(node) = graph.node_mut(&id) {
            node.position = position;
        }
    }
    count
}
