//! Manual-mode drag propagation: moving a member drags its spouses onto the
//! same line and re-centres every junction they share.

use std::cell::Cell;
use std::collections::HashSet;

use crate::graph::Graph;
use crate::ir::Position;
use crate::layout::place_junctions_touching;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Propagation {
    /// Members whose position changed, dragged member first.
    pub moved: Vec<(String, Position)>,
    pub spouses: Vec<String>,
    pub junctions: usize,
}

#[derive(Debug, Default)]
pub struct DragPropagator {
    updating: Cell<bool>,
}

/// Holds the propagator's update flag until dropped.
pub struct UpdateGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

impl DragPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_updating(&self) -> bool {
        self.updating.get()
    }

    /// Claims the update flag; `None` while another propagation holds it.
    pub fn begin(&self) -> Option<UpdateGuard<'_>> {
        if self.updating.replace(true) {
            return None;
        }
        Some(UpdateGuard {
            flag: &self.updating,
        })
    }

    /// Moves `member_id` to `position` and propagates alignment. Returns `None`
    /// when a propagation is already running or the node is not a member.
    pub fn propagate(
        &self,
        graph: &mut Graph,
        member_id: &str,
        position: Position,
        junction_offset: f32,
    ) -> Option<Propagation> {
        let _guard = self.begin()?;
        propagate_drag(graph, member_id, position, junction_offset)
    }
}

fn propagate_drag(
    graph: &mut Graph,
    member_id: &str,
    position: Position,
    junction_offset: f32,
) -> Option<Propagation> {
    let mut out = Propagation::default();

    let node = graph.node_mut(member_id).filter(|node| node.draggable())?;
    if node.position != position {
        node.position = position;
        out.moved.push((member_id.to_string(), position));
    }

    let mut spouse_ids: Vec<String> = Vec::new();
    for (_, junction) in graph.junctions() {
        let other = if junction.parent1 == member_id {
            &junction.parent2
        } else if junction.parent2 == member_id {
            &junction.parent1
        } else {
            continue;
        };
        if !spouse_ids.contains(other) {
            spouse_ids.push(other.clone());
        }
    }

    for spouse_id in &spouse_ids {
        let Some(spouse) = graph.node_mut(spouse_id) else {
            continue;
        };
        if spouse.position.y != position.y {
            spouse.position.y = position.y;
            out.moved.push((spouse_id.clone(), spouse.position));
        }
    }

    let mut affected: HashSet<String> = spouse_ids.iter().cloned().collect();
    affected.insert(member_id.to_string());
    out.junctions = place_junctions_touching(graph, junction_offset, &affected);
    out.spouses = spouse_ids;
    Some(out)
}
