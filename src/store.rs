//! Record-store contract the engine talks to, plus an in-memory store used by
//! the CLI and tests.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::ir::{DisplayIdentity, Member, Position, Relationship, RelationshipKind, TreeDocument};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("tree `{0}` not found")]
    TreeNotFound(String),
    #[error("member `{0}` not found")]
    MemberNotFound(String),
    #[error("relationship `{0}` not found")]
    RelationshipNotFound(String),
    #[error("`{from}` and `{to}` are already related by `{existing}`")]
    Duplicate {
        from: String,
        to: String,
        existing: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRelationship {
    pub from: String,
    pub to: String,
    pub kind: RelationshipKind,
    pub custom_label: Option<String>,
}

impl NewRelationship {
    pub fn new(from: &str, to: &str, kind: RelationshipKind) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            custom_label: None,
        }
    }
}

pub trait TreeStore {
    fn list_members(&self, tree_id: &str) -> Result<Vec<Member>, StoreError>;
    fn list_relationships(&self, tree_id: &str) -> Result<Vec<Relationship>, StoreError>;
    fn update_member_position(&mut self, member_id: &str, position: Position) -> Result<(), StoreError>;
    fn create_relationship(
        &mut self,
        tree_id: &str,
        relationship: NewRelationship,
    ) -> Result<Relationship, StoreError>;
    fn delete_relationship(&mut self, relationship_id: &str) -> Result<(), StoreError>;
    fn create_member(
        &mut self,
        tree_id: &str,
        display: DisplayIdentity,
        position: Position,
    ) -> Result<Member, StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    trees: BTreeMap<String, TreeDocument>,
    next_id: u64,
    offline: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree(tree: TreeDocument) -> Self {
        let mut store = Self::new();
        store.insert_tree(tree);
        store
    }

    pub fn insert_tree(&mut self, tree: TreeDocument) {
        self.trees.insert(tree.tree_id.clone(), tree);
    }

    pub fn tree(&self, tree_id: &str) -> Option<&TreeDocument> {
        self.trees.get(tree_id)
    }

    /// While offline every write fails with `StoreError::Unavailable`.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn remove_member(&mut self, member_id: &str) {
        for tree in self.trees.values_mut() {
            tree.members.retain(|member| member.id != member_id);
            tree.relationships
                .retain(|rel| rel.from != member_id && rel.to != member_id);
        }
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }

    fn tree_mut(&mut self, tree_id: &str) -> Result<&mut TreeDocument, StoreError> {
        self.trees
            .get_mut(tree_id)
            .ok_or_else(|| StoreError::TreeNotFound(tree_id.to_string()))
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        loop {
            self.next_id += 1;
            let id = format!("{prefix}{}", self.next_id);
            let taken = self.trees.values().any(|tree| {
                tree.members.iter().any(|member| member.id == id)
                    || tree.relationships.iter().any(|rel| rel.id == id)
            });
            if !taken {
                return id;
            }
        }
    }
}

impl TreeStore for MemoryStore {
    fn list_members(&self, tree_id: &str) -> Result<Vec<Member>, StoreError> {
        self.trees
            .get(tree_id)
            .map(|tree| tree.members.clone())
            .ok_or_else(|| StoreError::TreeNotFound(tree_id.to_string()))
    }

    fn list_relationships(&self, tree_id: &str) -> Result<Vec<Relationship>, StoreError> {
        self.trees
            .get(tree_id)
            .map(|tree| tree.relationships.clone())
            .ok_or_else(|| StoreError::TreeNotFound(tree_id.to_string()))
    }

    fn update_member_position(&mut self, member_id: &str, position: Position) -> Result<(), StoreError> {
        self.ensure_online()?;
        let member = self
            .trees
            .values_mut()
            .flat_map(|tree| tree.members.iter_mut())
            .find(|member| member.id == member_id)
            .ok_or_else(|| StoreError::MemberNotFound(member_id.to_string()))?;
        member.x = position.x;
        member.y = position.y;
        Ok(())
    }

    fn create_relationship(
        &mut self,
        tree_id: &str,
        relationship: NewRelationship,
    ) -> Result<Relationship, StoreError> {
        self.ensure_online()?;
        let id = self.fresh_id("r");
        let tree = self.tree_mut(tree_id)?;
        for endpoint in [&relationship.from, &relationship.to] {
            if tree.member(endpoint).is_none() {
                return Err(StoreError::MemberNotFound(endpoint.clone()));
            }
        }
        if let Some(existing) = tree
            .relationships
            .iter()
            .find(|rel| rel.connects(&relationship.from, &relationship.to))
        {
            return Err(StoreError::Duplicate {
                from: relationship.from,
                to: relationship.to,
                existing: existing.id.clone(),
            });
        }
        let created = Relationship {
            id,
            from: relationship.from,
            to: relationship.to,
            kind: relationship.kind,
            custom_label: relationship.custom_label,
        };
        tree.relationships.push(created.clone());
        Ok(created)
    }

    fn delete_relationship(&mut self, relationship_id: &str) -> Result<(), StoreError> {
        self.ensure_online()?;
        for tree in self.trees.values_mut() {
            let before = tree.relationships.len();
            tree.relationships.retain(|rel| rel.id != relationship_id);
            if tree.relationships.len() != before {
                return Ok(());
            }
        }
        Err(StoreError::RelationshipNotFound(relationship_id.to_string()))
    }

    fn create_member(
        &mut self,
        tree_id: &str,
        display: DisplayIdentity,
        position: Position,
    ) -> Result<Member, StoreError> {
        self.ensure_online()?;
        let id = self.fresh_id("m");
        let tree = self.tree_mut(tree_id)?;
        let member = Member {
            id,
            x: position.x,
            y: position.y,
            display,
        };
        tree.members.push(member.clone());
        Ok(member)
    }
}
