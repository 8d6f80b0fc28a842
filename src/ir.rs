use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DisplayIdentity {
    #[serde(rename_all = "camelCase")]
    Character { character_id: String },
    Inline {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date: Option<String>,
    },
}

impl DisplayIdentity {
    pub fn inline(name: &str) -> Self {
        Self::Inline {
            name: name.to_string(),
            date: None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Character { character_id } => format!("@{character_id}"),
            Self::Inline { name, date: Some(date) } => format!("{name} ({date})"),
            Self::Inline { name, date: None } => name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub display: DisplayIdentity,
}

impl Member {
    pub fn new(id: &str, display: DisplayIdentity) -> Self {
        Self {
            id: id.to_string(),
            x: 0.0,
            y: 0.0,
            display,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Relationship type tag. Anything outside the known set is kept verbatim so
/// it still renders as a plain labelled edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationshipKind {
    Parent,
    Child,
    Sibling,
    Marriage,
    Spouse,
    Adoption,
    Custom,
    Other(String),
}

impl RelationshipKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
            Self::Sibling => "sibling",
            Self::Marriage => "marriage",
            Self::Spouse => "spouse",
            Self::Adoption => "adoption",
            Self::Custom => "custom",
            Self::Other(kind) => kind.as_str(),
        }
    }

    pub fn is_couple(&self) -> bool {
        matches!(self, Self::Marriage | Self::Spouse)
    }

    pub fn is_parentage(&self) -> bool {
        matches!(self, Self::Parent | Self::Child)
    }
}

impl From<String> for RelationshipKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "parent" => Self::Parent,
            "child" => Self::Child,
            "sibling" => Self::Sibling,
            "marriage" => Self::Marriage,
            "spouse" => Self::Spouse,
            "adoption" => Self::Adoption,
            "custom" => Self::Custom,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for RelationshipKind {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<RelationshipKind> for String {
    fn from(value: RelationshipKind) -> Self {
        match value {
            RelationshipKind::Other(kind) => kind,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "fromMemberId")]
    pub from: String,
    #[serde(rename = "toMemberId")]
    pub to: String,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label: Option<String>,
}

impl Relationship {
    pub fn new(id: &str, from: &str, to: &str, kind: RelationshipKind) -> Self {
        Self {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            kind,
            custom_label: None,
        }
    }

    /// True when the relationship joins `a` and `b`, in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

/// A whole tree as exchanged with the record store and the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDocument {
    #[serde(default)]
    pub tree_id: String,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl TreeDocument {
    pub fn new(tree_id: &str) -> Self {
        Self {
            tree_id: tree_id.to_string(),
            ..Default::default()
        }
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kinds_round_trip_verbatim() {
        let json = r#"{"id":"r1","fromMemberId":"a","toMemberId":"b","type":"godparent"}"#;
        let rel: Relationship = serde_json::from_str(json).unwrap();
        assert_eq!(rel.kind, RelationshipKind::Other("godparent".to_string()));
        let out = serde_json::to_string(&rel).unwrap();
        assert!(out.contains(r#""type":"godparent""#));
    }

    #[test]
    fn connects_ignores_direction() {
        let rel = Relationship::new("r1", "a", "b", RelationshipKind::Sibling);
        assert!(rel.connects("a", "b"));
        assert!(rel.connects("b", "a"));
        assert!(!rel.connects("a", "c"));
    }

    #[test]
    fn display_identity_tagged_json() {
        let json = r#"{"id":"m1","x":4,"y":2,"display":{"type":"character","characterId":"c9"}}"#;
        let member: Member = serde_json::from_str(json).unwrap();
        assert_eq!(
            member.display,
            DisplayIdentity::Character {
                character_id: "c9".to_string()
            }
        );
        assert_eq!(member.position(), Position::new(4.0, 2.0));
    }
}
