//! Bounded linear undo/redo log.
//!
//! The log is a single array plus a cursor pointing at the last applied
//! action. Pushing drops everything after the cursor, and the oldest entry is
//! evicted once the log is full.

use crate::ir::{Position, Relationship};

pub const MAX_HISTORY: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryAction {
    MoveNode {
        member_id: String,
        old_position: Position,
        new_position: Position,
    },
    AddRelationship {
        relationship: Relationship,
    },
    RemoveRelationship {
        relationship: Relationship,
    },
}

impl HistoryAction {
    pub fn relationship(&self) -> Option<&Relationship> {
        match self {
            Self::MoveNode { .. } => None,
            Self::AddRelationship { relationship } | Self::RemoveRelationship { relationship } => {
                Some(relationship)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryAction>,
    cursor: Option<usize>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(MAX_HISTORY)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, action: HistoryAction) {
        let keep = self.cursor.map_or(0, |cursor| cursor + 1);
        self.entries.truncate(keep);
        self.entries.push(action);
        if self.entries.len() > self.limit {
            self.entries.remove(0);
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Action the next `undo` would return, without moving the cursor.
    pub fn peek_undo(&self) -> Option<&HistoryAction> {
        self.entries.get(self.cursor?)
    }

    /// Action the next `redo` would return, without moving the cursor.
    pub fn peek_redo(&self) -> Option<&HistoryAction> {
        self.entries.get(self.cursor.map_or(0, |cursor| cursor + 1))
    }

    /// Steps the cursor back and returns the action whose inverse the caller
    /// must apply.
    pub fn undo(&mut self) -> Option<HistoryAction> {
        let cursor = self.cursor?;
        let action = self.entries.get(cursor).cloned()?;
        self.cursor = cursor.checked_sub(1);
        Some(action)
    }

    /// Steps the cursor forward and returns the action to re-apply.
    pub fn redo(&mut self) -> Option<HistoryAction> {
        let next = self.cursor.map_or(0, |cursor| cursor + 1);
        let action = self.entries.get(next).cloned()?;
        self.cursor = Some(next);
        Some(action)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |cursor| cursor + 1) < self.entries.len()
    }

    /// Cursor in the `-1`-when-empty convention used by the UI.
    pub fn index(&self) -> isize {
        self.cursor.map_or(-1, |cursor| cursor as isize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryAction] {
        &self.entries
    }

    /// Points every snapshot of relationship `old_id` at its re-created record.
    pub fn rebind_relationship(&mut self, old_id: &str, replacement: &Relationship) {
        for entry in &mut self.entries {
            match entry {
                HistoryAction::AddRelationship { relationship }
                | HistoryAction::RemoveRelationship { relationship }
                    if relationship.id == old_id =>
                {
                    *relationship = replacement.clone();
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::RelationshipKind;

    fn mv(step: usize) -> HistoryAction {
        HistoryAction::MoveNode {
            member_id: "m".to_string(),
            old_position: Position::new(step as f32, 0.0),
            new_position: Position::new(step as f32 + 1.0, 0.0),
        }
    }

    #[test]
    fn empty_history_has_negative_index() {
        let mut history = History::new();
        assert_eq!(history.index(), -1);
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn caps_at_max_history() {
        let mut history = History::new();
        for step in 0..25 {
            history.push(mv(step));
        }
        assert_eq!(history.len(), 20);
        assert_eq!(history.index(), 19);
        assert_eq!(history.entries()[0], mv(5));
    }

    #[test]
    fn push_after_undo_discards_redo_branch() {
        let mut history = History::new();
        for step in 0..25 {
            history.push(mv(step));
        }
        for _ in 0..3 {
            assert!(history.undo().is_some());
        }
        assert_eq!(history.index(), 16);
        history.push(mv(100));
        assert_eq!(history.len(), 18);
        assert_eq!(history.index(), 17);
        assert!(!history.can_redo());
        assert!(history.redo().is_none());
    }

    #[test]
    fn undo_then_redo_returns_same_action() {
        let mut history = History::new();
        history.push(mv(1));
        history.push(mv(2));
        assert_eq!(history.undo(), Some(mv(2)));
        assert_eq!(history.undo(), Some(mv(1)));
        assert_eq!(history.index(), -1);
        assert!(history.undo().is_none());
        assert_eq!(history.redo(), Some(mv(1)));
        assert_eq!(history.redo(), Some(mv(2)));
        assert!(history.redo().is_none());
    }

    #[test]
    fn peeking_leaves_the_cursor_alone() {
        let mut history = History::new();
        assert!(history.peek_undo().is_none());
        history.push(mv(1));
        history.push(mv(2));
        assert_eq!(history.peek_undo(), Some(&mv(2)));
        assert!(history.peek_redo().is_none());
        assert_eq!(history.index(), 1);

        history.undo();
        assert_eq!(history.peek_redo(), Some(&mv(2)));
        assert_eq!(history.peek_undo(), Some(&mv(1)));
        assert_eq!(history.index(), 0);
    }

    #[test]
    fn rebind_updates_all_snapshots() {
        let mut history = History::new();
        let original = Relationship::new("r1", "a", "b", RelationshipKind::Sibling);
        history.push(HistoryAction::AddRelationship {
            relationship: original.clone(),
        });
        history.push(HistoryAction::RemoveRelationship {
            relationship: original,
        });
        let recreated = Relationship::new("r9", "a", "b", RelationshipKind::Sibling);
        history.rebind_relationship("r1", &recreated);
        assert!(history
            .entries()
            .iter()
            .all(|entry| entry.relationship().map(|rel| rel.id.as_str()) == Some("r9")));
    }
}
