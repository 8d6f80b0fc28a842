use std::collections::{BTreeMap, BTreeSet};

use crate::ir::Relationship;

#[derive(Debug, Clone, PartialEq)]
pub struct ParentLink {
    pub target: String,
    pub relationship_id: String,
}

/// Adjacency indexes derived from one relationship list.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Symmetric: every couple appears under both members.
    pub marriages: BTreeMap<String, BTreeSet<String>>,
    /// Keyed by the relationship's `from` member.
    pub parent_children: BTreeMap<String, Vec<ParentLink>>,
}

impl Classification {
    pub fn spouses(&self, member_id: &str) -> impl Iterator<Item = &String> {
        self.marriages.get(member_id).into_iter().flatten()
    }

    pub fn children(&self, member_id: &str) -> &[ParentLink] {
        self.parent_children
            .get(member_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub fn classify_relationships(relationships: &[Relationship]) -> Classification {
    let mut classes = Classification::default();
    for rel in relationships {
        if rel.kind.is_couple() {
            classes
                .marriages
                .entry(rel.from.clone())
                .or_default()
                .insert(rel.to.clone());
            classes
                .marriages
                .entry(rel.to.clone())
                .or_default()
                .insert(rel.from.clone());
        } else if rel.kind.is_parentage() {
            classes
                .parent_children
                .entry(rel.from.clone())
                .or_default()
                .push(ParentLink {
                    target: rel.to.clone(),
                    relationship_id: rel.id.clone(),
                });
        }
    }
    classes
}
