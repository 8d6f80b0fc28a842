//! Stateful family-tree engine.
//!
//! One engine owns the graph published to the renderer for a single tree.
//! Data revisions go through the structural diff gate; drags and undo/redo
//! mutate positions directly. Store writes for positions are fire-and-forget:
//! a failed write is logged and reported through [`TreeEngine::take_persist_failures`]
//! but local state is never rolled back.

use std::collections::HashMap;

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::{Config, LayoutMode};
use crate::drag::{DragPropagator, Propagation};
use crate::graph::{Classification, Graph, assemble_graph};
use crate::history::{History, HistoryAction};
use crate::ir::{DisplayIdentity, Member, Position, Relationship, RelationshipKind};
use crate::layout::{DagreLayout, LayoutProvider, apply_auto_layout};
use crate::signature::DiffGate;
use crate::store::{NewRelationship, StoreError, TreeStore};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("member `{0}` is not in this tree")]
    UnknownMember(String),
    #[error("relationship `{0}` is not in this tree")]
    UnknownRelationship(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    Published,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    SelfRelationship { member_id: String },
    Duplicate { existing_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    Created(Relationship),
    Rejected(Rejection),
}

/// Role of a newly added member relative to the member it is added from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedAs {
    Parent,
    Child,
    Spouse,
    Sibling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistFailure {
    pub member_id: String,
    pub position: Position,
    pub error: StoreError,
}

pub struct TreeEngine<S: TreeStore> {
    tree_id: String,
    store: S,
    layout: Box<dyn LayoutProvider>,
    config: Config,
    mode: LayoutMode,
    members: Vec<Member>,
    relationships: Vec<Relationship>,
    graph: Graph,
    classes: Classification,
    gate: DiffGate,
    drag: DragPropagator,
    drag_origins: HashMap<String, Position>,
    history: History,
    revision: u64,
    persist_failures: Vec<PersistFailure>,
}

impl<S: TreeStore> TreeEngine<S> {
    pub fn new(tree_id: &str, store: S, config: Config) -> Self {
        let mode = config.engine.mode;
        let history = History::with_limit(config.engine.history_limit);
        Self {
            tree_id: tree_id.to_string(),
            store,
            layout: Box::new(DagreLayout),
            config,
            mode,
            members: Vec::new(),
            relationships: Vec::new(),
            graph: Graph::default(),
            classes: Classification::default(),
            gate: DiffGate::new(),
            drag: DragPropagator::new(),
            drag_origins: HashMap::new(),
            history,
            revision: 0,
            persist_failures: Vec::new(),
        }
    }

    pub fn with_layout(mut self, layout: impl LayoutProvider + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    pub fn tree_id(&self) -> &str {
        &self.tree_id
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Bumped every time the renderer should pick up a new graph or new
    /// positions.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn take_persist_failures(&mut self) -> Vec<PersistFailure> {
        std::mem::take(&mut self.persist_failures)
    }

    /// Re-sends every queued failed write using the member's current position.
    /// Members that disappeared since are dropped. Returns the number of
    /// writes that still fail.
    pub fn retry_failed_persists(&mut self) -> usize {
        let failed = std::mem::take(&mut self.persist_failures);
        let mut retried: Vec<String> = Vec::new();
        for failure in failed {
            if retried.contains(&failure.member_id) {
                continue;
            }
            let Some(position) = self.graph.position(&failure.member_id) else {
                continue;
            };
            self.persist_position(&failure.member_id, position);
            retried.push(failure.member_id);
        }
        self.persist_failures.len()
    }

    /// Re-reads members and relationships from the store.
    pub fn refresh(&mut self) -> Result<Publish, EngineError> {
        let members = self.store.list_members(&self.tree_id)?;
        let relationships = self.store.list_relationships(&self.tree_id)?;
        Ok(self.load(members, relationships))
    }

    pub fn load(&mut self, members: Vec<Member>, relationships: Vec<Relationship>) -> Publish {
        self.members = members;
        self.relationships = relationships;
        self.rebuild()
    }

    fn rebuild(&mut self) -> Publish {
        let mut assembly = assemble_graph(&self.members, &self.relationships, &self.config.layout);
        if self.mode == LayoutMode::Auto {
            apply_auto_layout(
                &mut assembly.graph,
                &assembly.classes,
                self.layout.as_ref(),
                &self.config.layout,
            );
        }
        if !self.gate.should_publish(&assembly.graph) {
            debug!("tree {}: structure unchanged, skipping publish", self.tree_id);
            return Publish::Unchanged;
        }
        self.graph = assembly.graph;
        self.classes = assembly.classes;
        self.revision += 1;
        debug!(
            "tree {}: published revision {} ({} nodes, {} edges)",
            self.tree_id,
            self.revision,
            self.graph.nodes.len(),
            self.graph.edges.len()
        );
        Publish::Published
    }

    pub fn toggle_auto_layout(&mut self) -> LayoutMode {
        self.drag_origins.clear();
        self.mode = match self.mode {
            LayoutMode::Auto => {
                // manual mode starts from what is on screen
                self.persist_member_positions();
                LayoutMode::Manual
            }
            LayoutMode::Manual => {
                self.relayout();
                LayoutMode::Auto
            }
        };
        info!("tree {}: layout mode is now {:?}", self.tree_id, self.mode);
        self.mode
    }

    /// Runs the auto-layout once over the current graph. In manual mode the
    /// resulting positions are persisted.
    pub fn reset_layout(&mut self) {
        self.relayout();
        if self.mode == LayoutMode::Manual {
            self.persist_member_positions();
        }
    }

    fn relayout(&mut self) {
        apply_auto_layout(
            &mut self.graph,
            &self.classes,
            self.layout.as_ref(),
            &self.config.layout,
        );
        let positions: Vec<(String, Position)> = self
            .graph
            .members()
            .map(|node| (node.id.clone(), node.position))
            .collect();
        for (id, position) in positions {
            self.sync_member(&id, position);
        }
        self.revision += 1;
    }

    pub fn on_node_drag_start(&mut self, member_id: &str) -> bool {
        if self.mode != LayoutMode::Manual {
            return false;
        }
        let Some(node) = self.graph.node(member_id).filter(|node| node.draggable()) else {
            return false;
        };
        self.drag_origins.insert(member_id.to_string(), node.position);
        true
    }

    pub fn on_node_drag(&mut self, member_id: &str, position: Position) -> Option<Propagation> {
        if self.mode != LayoutMode::Manual {
            return None;
        }
        self.apply_position(member_id, position)
    }

    /// Finishes a drag: propagates the final position, records a move in the
    /// history when the member actually moved, and persists every member the
    /// drag repositioned.
    pub fn on_node_drag_stop(&mut self, member_id: &str, position: Position) -> Option<Propagation> {
        if self.mode != LayoutMode::Manual {
            return None;
        }
        let origin = self.drag_origins.remove(member_id);
        let propagation = self.apply_position(member_id, position)?;

        if let Some(old_position) = origin {
            if old_position != position {
                self.history.push(HistoryAction::MoveNode {
                    member_id: member_id.to_string(),
                    old_position,
                    new_position: position,
                });
            }
        }

        self.persist_propagation(member_id, position, &propagation);
        Some(propagation)
    }

    /// Applies the inverse of the last action. The cursor only moves once the
    /// inverse went through; a store error leaves the action in place. Moves
    /// are held back outside manual mode.
    pub fn undo(&mut self) -> Result<bool, EngineError> {
        let Some(action) = self.history.peek_undo().cloned() else {
            return Ok(false);
        };
        if !self.accepts_move(&action) {
            return Ok(false);
        }
        let applied = match action {
            HistoryAction::MoveNode {
                member_id,
                old_position,
                ..
            } => self.restore_position(&member_id, old_position),
            HistoryAction::AddRelationship { relationship } => {
                self.remove_relationship(&relationship)?
            }
            HistoryAction::RemoveRelationship { relationship } => {
                self.recreate_relationship(&relationship)?
            }
        };
        self.history.undo();
        Ok(applied)
    }

    pub fn redo(&mut self) -> Result<bool, EngineError> {
        let Some(action) = self.history.peek_redo().cloned() else {
            return Ok(false);
        };
        if !self.accepts_move(&action) {
            return Ok(false);
        }
        let applied = match action {
            HistoryAction::MoveNode {
                member_id,
                new_position,
                ..
            } => self.restore_position(&member_id, new_position),
            HistoryAction::AddRelationship { relationship } => {
                self.recreate_relationship(&relationship)?
            }
            HistoryAction::RemoveRelationship { relationship } => {
                self.remove_relationship(&relationship)?
            }
        };
        self.history.redo();
        Ok(applied)
    }

    fn accepts_move(&self, action: &HistoryAction) -> bool {
        if self.mode == LayoutMode::Manual || !matches!(action, HistoryAction::MoveNode { .. }) {
            return true;
        }
        debug!(
            "tree {}: auto layout owns positions, holding back move undo/redo",
            self.tree_id
        );
        false
    }

    /// Relates two members. Self links and pairs that are already related in
    /// either direction are rejected without touching the store.
    pub fn connect(
        &mut self,
        from: &str,
        to: &str,
        kind: RelationshipKind,
        custom_label: Option<String>,
    ) -> Result<ConnectOutcome, EngineError> {
        if from == to {
            return Ok(ConnectOutcome::Rejected(Rejection::SelfRelationship {
                member_id: from.to_string(),
            }));
        }
        if let Some(existing) = self.relationships.iter().find(|rel| rel.connects(from, to)) {
            return Ok(ConnectOutcome::Rejected(Rejection::Duplicate {
                existing_id: existing.id.clone(),
            }));
        }
        for id in [from, to] {
            if !self.has_member(id) {
                return Err(EngineError::UnknownMember(id.to_string()));
            }
        }

        let request = NewRelationship {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            custom_label,
        };
        let created = match self.store.create_relationship(&self.tree_id, request) {
            Ok(created) => created,
            Err(StoreError::Duplicate { existing, .. }) => {
                return Ok(ConnectOutcome::Rejected(Rejection::Duplicate {
                    existing_id: existing,
                }));
            }
            Err(err) => return Err(err.into()),
        };

        self.relationships.push(created.clone());
        self.history.push(HistoryAction::AddRelationship {
            relationship: created.clone(),
        });
        self.rebuild();
        Ok(ConnectOutcome::Created(created))
    }

    pub fn disconnect(&mut self, relationship_id: &str) -> Result<Relationship, EngineError> {
        let relationship = self
            .relationships
            .iter()
            .find(|rel| rel.id == relationship_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownRelationship(relationship_id.to_string()))?;
        self.store.delete_relationship(relationship_id)?;
        self.relationships.retain(|rel| rel.id != relationship_id);
        self.history.push(HistoryAction::RemoveRelationship {
            relationship: relationship.clone(),
        });
        self.rebuild();
        Ok(relationship)
    }

    /// Creates a member next to `anchor_id` and relates it in the given role.
    pub fn add_related_member(
        &mut self,
        anchor_id: &str,
        display: DisplayIdentity,
        role: RelatedAs,
    ) -> Result<(Member, ConnectOutcome), EngineError> {
        let anchor = self
            .graph
            .position(anchor_id)
            .or_else(|| {
                self.members
                    .iter()
                    .find(|member| member.id == anchor_id)
                    .map(Member::position)
            })
            .ok_or_else(|| EngineError::UnknownMember(anchor_id.to_string()))?;

        let layout = &self.config.layout;
        let across = layout.member_width + layout.node_spacing;
        let down = layout.member_height + layout.rank_spacing;
        let position = match role {
            RelatedAs::Parent => Position::new(anchor.x, anchor.y - down),
            RelatedAs::Child => Position::new(anchor.x, anchor.y + down),
            RelatedAs::Spouse => Position::new(anchor.x + across, anchor.y),
            RelatedAs::Sibling => Position::new(anchor.x - across, anchor.y),
        };

        let member = self.store.create_member(&self.tree_id, display, position)?;
        self.members.push(member.clone());

        let (from, to, kind) = match role {
            RelatedAs::Parent => (member.id.as_str(), anchor_id, RelationshipKind::Parent),
            RelatedAs::Child => (anchor_id, member.id.as_str(), RelationshipKind::Parent),
            RelatedAs::Spouse => (anchor_id, member.id.as_str(), RelationshipKind::Spouse),
            RelatedAs::Sibling => (anchor_id, member.id.as_str(), RelationshipKind::Sibling),
        };
        let (from, to) = (from.to_string(), to.to_string());
        let outcome = match self.connect(&from, &to, kind, None) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.rebuild();
                return Err(err);
            }
        };
        if matches!(outcome, ConnectOutcome::Rejected(_)) {
            // the member still exists, it just has no link yet
            self.rebuild();
        }
        Ok((member, outcome))
    }

    fn has_member(&self, member_id: &str) -> bool {
        self.members.iter().any(|member| member.id == member_id)
    }

    fn apply_position(&mut self, member_id: &str, position: Position) -> Option<Propagation> {
        let offset = self.config.layout.junction_offset();
        let propagation = self
            .drag
            .propagate(&mut self.graph, member_id, position, offset)?;
        for (id, moved) in &propagation.moved {
            self.sync_member(id, *moved);
        }
        self.revision += 1;
        Some(propagation)
    }

    fn restore_position(&mut self, member_id: &str, position: Position) -> bool {
        if self.graph.node(member_id).is_none() {
            warn!(
                "tree {}: history target `{member_id}` no longer exists, skipping",
                self.tree_id
            );
            return false;
        }
        let Some(propagation) = self.apply_position(member_id, position) else {
            return false;
        };
        self.persist_propagation(member_id, position, &propagation);
        true
    }

    fn remove_relationship(&mut self, relationship: &Relationship) -> Result<bool, EngineError> {
        if !self.relationships.iter().any(|rel| rel.id == relationship.id) {
            warn!(
                "tree {}: relationship `{}` already gone, skipping",
                self.tree_id, relationship.id
            );
            return Ok(false);
        }
        self.store.delete_relationship(&relationship.id)?;
        self.relationships.retain(|rel| rel.id != relationship.id);
        self.rebuild();
        Ok(true)
    }

    fn recreate_relationship(&mut self, relationship: &Relationship) -> Result<bool, EngineError> {
        if !self.has_member(&relationship.from) || !self.has_member(&relationship.to) {
            warn!(
                "tree {}: endpoints of relationship `{}` no longer exist, skipping",
                self.tree_id, relationship.id
            );
            return Ok(false);
        }
        if self
            .relationships
            .iter()
            .any(|rel| rel.connects(&relationship.from, &relationship.to))
        {
            return Ok(false);
        }
        let request = NewRelationship {
            from: relationship.from.clone(),
            to: relationship.to.clone(),
            kind: relationship.kind.clone(),
            custom_label: relationship.custom_label.clone(),
        };
        let created = self.store.create_relationship(&self.tree_id, request)?;
        self.history.rebind_relationship(&relationship.id, &created);
        self.relationships.push(created);
        self.rebuild();
        Ok(true)
    }

    fn sync_member(&mut self, member_id: &str, position: Position) {
        if let Some(member) = self.members.iter_mut().find(|member| member.id == member_id) {
            member.x = position.x;
            member.y = position.y;
        }
    }

    /// Persists the moved member and every spouse the move realigned.
    fn persist_propagation(&mut self, member_id: &str, position: Position, propagation: &Propagation) {
        self.persist_position(member_id, position);
        for spouse_id in &propagation.spouses {
            if let Some(spouse) = self.graph.position(spouse_id) {
                self.persist_position(spouse_id, spouse);
            }
        }
    }

    fn persist_member_positions(&mut self) {
        let positions: Vec<(String, Position)> = self
            .graph
            .members()
            .map(|node| (node.id.clone(), node.position))
            .collect();
        for (id, position) in positions {
            self.sync_member(&id, position);
            self.persist_position(&id, position);
        }
    }

    fn persist_position(&mut self, member_id: &str, position: Position) {
        if let Err(error) = self.store.update_member_position(member_id, position) {
            warn!(
                "tree {}: failed to persist position of `{member_id}`: {error}",
                self.tree_id
            );
            self.persist_failures.push(PersistFailure {
                member_id: member_id.to_string(),
                position,
                error,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ir::TreeDocument;
    use crate::layout::{LayoutEdge, LayoutNode, LayoutOptions};
    use crate::store::MemoryStore;
    use std::collections::BTreeMap;

    /// Puts every member on one row, 100 apart, in graph order.
    struct RowLayout;

    impl LayoutProvider for RowLayout {
        fn layout(
            &self,
            nodes: &[LayoutNode],
            _edges: &[LayoutEdge],
            _options: &LayoutOptions,
        ) -> BTreeMap<String, Position> {
            nodes
                .iter()
                .enumerate()
                .map(|(idx, node)| (node.id.clone(), Position::new(idx as f32 * 100.0, 0.0)))
                .collect()
        }
    }

    fn document() -> TreeDocument {
        let mut doc = TreeDocument::new("t1");
        doc.members = vec![
            Member::new("M1", DisplayIdentity::inline("Ada")).at(0.0, 0.0),
            Member::new("M2", DisplayIdentity::inline("Ben")).at(200.0, 0.0),
            Member::new("C1", DisplayIdentity::inline("Cal")).at(100.0, 200.0),
            Member::new("D1", DisplayIdentity::inline("Dot")).at(400.0, 200.0),
        ];
        doc.relationships = vec![
            Relationship::new("r1", "M1", "M2", RelationshipKind::Marriage),
            Relationship::new("r2", "M1", "C1", RelationshipKind::Parent),
            Relationship::new("r3", "M2", "C1", RelationshipKind::Parent),
        ];
        doc
    }

    fn manual_engine() -> TreeEngine<MemoryStore> {
        let config = Config {
            engine: EngineConfig {
                mode: LayoutMode::Manual,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut engine = TreeEngine::new("t1", MemoryStore::with_tree(document()), config)
            .with_layout(RowLayout);
        engine.refresh().unwrap();
        engine
    }

    #[test]
    fn same_input_publishes_once() {
        let mut engine = manual_engine();
        let revision = engine.revision();
        assert_eq!(engine.refresh().unwrap(), Publish::Unchanged);
        assert_eq!(engine.revision(), revision);
    }

    #[test]
    fn drag_is_ignored_in_auto_mode() {
        let mut engine = TreeEngine::new("t1", MemoryStore::with_tree(document()), Config::default())
            .with_layout(RowLayout);
        engine.refresh().unwrap();
        assert!(!engine.on_node_drag_start("M1"));
        assert!(engine.on_node_drag("M1", Position::new(5.0, 5.0)).is_none());
    }

    #[test]
    fn drag_stop_records_history_and_persists_spouse() {
        let mut engine = manual_engine();
        assert!(engine.on_node_drag_start("M1"));
        engine.on_node_drag("M1", Position::new(10.0, 40.0));
        engine.on_node_drag_stop("M1", Position::new(20.0, 50.0)).unwrap();

        assert_eq!(engine.history().len(), 1);
        let stored = engine.store().tree("t1").unwrap();
        assert_eq!(stored.member("M1").unwrap().position(), Position::new(20.0, 50.0));
        assert_eq!(stored.member("M2").unwrap().position(), Position::new(200.0, 50.0));
    }

    #[test]
    fn drag_without_movement_records_nothing() {
        let mut engine = manual_engine();
        engine.on_node_drag_start("M1");
        engine.on_node_drag_stop("M1", Position::new(0.0, 0.0));
        assert!(engine.history().is_empty());
    }

    #[test]
    fn undo_and_redo_move_spouses_together() {
        let mut engine = manual_engine();
        engine.on_node_drag_start("M1");
        engine.on_node_drag_stop("M1", Position::new(0.0, 80.0));
        assert_eq!(engine.graph().position("M2").unwrap().y, 80.0);

        assert!(engine.undo().unwrap());
        assert_eq!(engine.graph().position("M1").unwrap(), Position::new(0.0, 0.0));
        assert_eq!(engine.graph().position("M2").unwrap().y, 0.0);
        assert_eq!(
            engine.graph().position("junction-M1-M2").unwrap(),
            Position::new(96.0, -4.0)
        );
        assert!(!engine.undo().unwrap());

        assert!(engine.redo().unwrap());
        assert_eq!(engine.graph().position("M1").unwrap(), Position::new(0.0, 80.0));
        assert!(!engine.redo().unwrap());
    }

    #[test]
    fn undo_skips_deleted_member() {
        let mut engine = manual_engine();
        engine.on_node_drag_start("C1");
        engine.on_node_drag_stop("C1", Position::new(300.0, 300.0));
        engine.store_mut().remove_member("C1");
        engine.refresh().unwrap();

        assert!(!engine.undo().unwrap());
        assert_eq!(engine.history().index(), -1);
    }

    #[test]
    fn failed_persist_keeps_local_state() {
        let mut engine = manual_engine();
        engine.store_mut().set_offline(true);
        engine.on_node_drag_start("C1");
        engine.on_node_drag_stop("C1", Position::new(300.0, 300.0));

        assert_eq!(engine.graph().position("C1").unwrap(), Position::new(300.0, 300.0));
        let failures = engine.take_persist_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].member_id, "C1");
        assert!(engine.take_persist_failures().is_empty());
    }

    #[test]
    fn retry_sends_latest_position_once_back_online() {
        let mut engine = manual_engine();
        engine.store_mut().set_offline(true);
        for y in [300.0, 310.0] {
            engine.on_node_drag_start("C1");
            engine.on_node_drag_stop("C1", Position::new(300.0, y));
        }
        assert_eq!(engine.retry_failed_persists(), 1);

        engine.store_mut().set_offline(false);
        assert_eq!(engine.retry_failed_persists(), 0);
        let stored = engine.store().tree("t1").unwrap();
        assert_eq!(stored.member("C1").unwrap().position(), Position::new(300.0, 310.0));
    }

    #[test]
    fn connect_rejects_self_and_duplicates() {
        let mut engine = manual_engine();
        let revision = engine.revision();
        assert_eq!(
            engine.connect("M1", "M1", RelationshipKind::Sibling, None).unwrap(),
            ConnectOutcome::Rejected(Rejection::SelfRelationship {
                member_id: "M1".to_string()
            })
        );
        assert_eq!(
            engine.connect("C1", "M2", RelationshipKind::Child, None).unwrap(),
            ConnectOutcome::Rejected(Rejection::Duplicate {
                existing_id: "r3".to_string()
            })
        );
        assert_eq!(engine.relationships().len(), 3);
        assert_eq!(engine.revision(), revision);
        assert!(engine.history().is_empty());
    }

    #[test]
    fn connect_unknown_member_is_an_error() {
        let mut engine = manual_engine();
        assert!(matches!(
            engine.connect("M1", "ghost", RelationshipKind::Sibling, None),
            Err(EngineError::UnknownMember(id)) if id == "ghost"
        ));
    }

    #[test]
    fn relationship_changes_are_undoable() {
        let mut engine = manual_engine();
        let ConnectOutcome::Created(ward) = engine
            .connect("C1", "D1", RelationshipKind::Custom, Some("ward".to_string()))
            .unwrap()
        else {
            panic!("expected a new relationship");
        };
        assert_eq!(
            engine.graph().edge(&ward.id).unwrap().label.as_deref(),
            Some("ward")
        );

        assert!(engine.undo().unwrap());
        assert!(engine.graph().edge(&ward.id).is_none());
        assert_eq!(engine.store().tree("t1").unwrap().relationships.len(), 3);

        assert!(engine.redo().unwrap());
        let recreated = engine
            .relationships()
            .iter()
            .find(|rel| rel.connects("C1", "D1"))
            .cloned()
            .unwrap();
        assert_ne!(recreated.id, ward.id);
        assert_eq!(recreated.custom_label.as_deref(), Some("ward"));
        assert!(engine.graph().edge(&recreated.id).is_some());

        assert!(engine.undo().unwrap());
        assert!(engine.graph().edge(&recreated.id).is_none());
    }

    #[test]
    fn store_failure_keeps_relationship_action_undoable() {
        let mut engine = manual_engine();
        let ConnectOutcome::Created(link) = engine
            .connect("C1", "D1", RelationshipKind::Sibling, None)
            .unwrap()
        else {
            panic!("expected a new relationship");
        };

        engine.store_mut().set_offline(true);
        assert!(matches!(engine.undo(), Err(EngineError::Store(StoreError::Unavailable(_)))));
        assert_eq!(engine.history().index(), 0);
        assert!(engine.graph().edge(&link.id).is_some());

        engine.store_mut().set_offline(false);
        assert!(engine.undo().unwrap());
        assert_eq!(engine.history().index(), -1);
        assert!(engine.graph().edge(&link.id).is_none());

        engine.store_mut().set_offline(true);
        assert!(engine.redo().is_err());
        assert_eq!(engine.history().index(), -1);

        engine.store_mut().set_offline(false);
        assert!(engine.redo().unwrap());
        assert_eq!(engine.history().index(), 0);
        assert!(engine.relationships().iter().any(|rel| rel.connects("C1", "D1")));
    }

    #[test]
    fn undo_persists_realigned_spouse() {
        let mut engine = manual_engine();
        engine.on_node_drag_start("M1");
        engine.on_node_drag_stop("M1", Position::new(0.0, 80.0));
        assert!(engine.undo().unwrap());

        let stored = engine.store().tree("t1").unwrap();
        assert_eq!(stored.member("M1").unwrap().position(), Position::new(0.0, 0.0));
        assert_eq!(stored.member("M2").unwrap().position(), Position::new(200.0, 0.0));

        assert!(engine.redo().unwrap());
        let stored = engine.store().tree("t1").unwrap();
        assert_eq!(stored.member("M2").unwrap().position(), Position::new(200.0, 80.0));
    }

    #[test]
    fn moves_wait_for_manual_mode_to_undo() {
        let mut engine = manual_engine();
        engine.on_node_drag_start("D1");
        engine.on_node_drag_stop("D1", Position::new(900.0, 900.0));
        assert_eq!(engine.toggle_auto_layout(), LayoutMode::Auto);
        let laid_out = engine.graph().position("D1").unwrap();

        assert!(!engine.undo().unwrap());
        assert_eq!(engine.graph().position("D1").unwrap(), laid_out);
        assert_eq!(engine.history().index(), 0);

        assert_eq!(engine.toggle_auto_layout(), LayoutMode::Manual);
        assert!(engine.undo().unwrap());
        assert_eq!(engine.graph().position("D1").unwrap(), Position::new(400.0, 200.0));
        assert_eq!(engine.history().index(), -1);
    }

    /// Accepts members but refuses every new relationship.
    struct LinklessStore(MemoryStore);

    impl TreeStore for LinklessStore {
        fn list_members(&self, tree_id: &str) -> Result<Vec<Member>, StoreError> {
            self.0.list_members(tree_id)
        }

        fn list_relationships(&self, tree_id: &str) -> Result<Vec<Relationship>, StoreError> {
            self.0.list_relationships(tree_id)
        }

        fn update_member_position(&mut self, member_id: &str, position: Position) -> Result<(), StoreError> {
            self.0.update_member_position(member_id, position)
        }

        fn create_relationship(
            &mut self,
            _tree_id: &str,
            _relationship: NewRelationship,
        ) -> Result<Relationship, StoreError> {
            Err(StoreError::Unavailable("links are read-only".to_string()))
        }

        fn delete_relationship(&mut self, relationship_id: &str) -> Result<(), StoreError> {
            self.0.delete_relationship(relationship_id)
        }

        fn create_member(
            &mut self,
            tree_id: &str,
            display: DisplayIdentity,
            position: Position,
        ) -> Result<Member, StoreError> {
            self.0.create_member(tree_id, display, position)
        }
    }

    #[test]
    fn failed_link_still_shows_the_new_member() {
        let config = Config {
            engine: EngineConfig {
                mode: LayoutMode::Manual,
                ..Default::default()
            },
            ..Default::default()
        };
        let store = LinklessStore(MemoryStore::with_tree(document()));
        let mut engine = TreeEngine::new("t1", store, config).with_layout(RowLayout);
        engine.refresh().unwrap();
        assert_eq!(engine.graph().members().count(), 4);

        assert!(engine
            .add_related_member("D1", DisplayIdentity::inline("Eve"), RelatedAs::Sibling)
            .is_err());
        assert_eq!(engine.members().len(), 5);
        assert_eq!(engine.graph().members().count(), 5);
    }

    #[test]
    fn disconnecting_a_parent_dissolves_the_junction() {
        let mut engine = manual_engine();
        engine.disconnect("r3").unwrap();
        assert!(engine.graph().node("junction-M1-M2").is_none());
        assert!(engine.graph().edge("r1").is_some());
        assert!(engine.graph().edge("r2").is_some());

        engine.undo().unwrap();
        assert!(engine.graph().node("junction-M1-M2").is_some());
    }

    #[test]
    fn add_related_child_lands_below_anchor() {
        let mut engine = manual_engine();
        let (member, outcome) = engine
            .add_related_member("C1", DisplayIdentity::inline("Dee"), RelatedAs::Child)
            .unwrap();
        assert!(matches!(outcome, ConnectOutcome::Created(_)));
        let anchor = engine.graph().position("C1").unwrap();
        let placed = engine.graph().position(&member.id).unwrap();
        assert_eq!(placed.x, anchor.x);
        assert!(placed.y > anchor.y);
    }

    #[test]
    fn toggling_to_auto_relayouts_and_aligns() {
        let mut engine = manual_engine();
        assert_eq!(engine.toggle_auto_layout(), LayoutMode::Auto);
        let graph = engine.graph();
        assert_eq!(graph.position("M1").unwrap(), Position::new(0.0, 0.0));
        assert_eq!(graph.position("M2").unwrap(), Position::new(100.0, 0.0));
        assert_eq!(
            graph.position("junction-M1-M2").unwrap(),
            Position::new(46.0, -4.0)
        );
        assert_eq!(engine.toggle_auto_layout(), LayoutMode::Manual);
        let stored = engine.store().tree("t1").unwrap();
        assert_eq!(stored.member("M2").unwrap().position(), Position::new(100.0, 0.0));
    }
}
