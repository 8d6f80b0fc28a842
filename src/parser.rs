//! Line-oriented text format for family trees.
//!
//! ```text
//! familytree
//! %% comments start with %%
//! member ada "Ada Hart" 1815 @0,0
//! member ben character:char_42
//! ada -- ben marriage
//! ada -> cal parent #r7
//! ben -- cal custom "godparent"
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

use crate::ir::{DisplayIdentity, Member, Relationship, RelationshipKind, TreeDocument};

static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^familytree(?:\s+(\S+))?\s*$").unwrap());
static MEMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^member\s+([\w-]+)(?:\s+character:(\S+)|\s+"([^"]*)"(?:\s+([^@\s]\S*))?)?(?:\s+@(-?[\d.]+),(-?[\d.]+))?\s*$"#,
    )
    .unwrap()
});
static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([\w-]+)\s*(?:--|->)\s*([\w-]+)\s+(\w+)(?:\s+"([^"]*)")?(?:\s+#([\w-]+))?\s*$"#)
        .unwrap()
});

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("missing `familytree` header")]
    MissingHeader,
    #[error("line {line}: cannot parse `{text}`")]
    Syntax { line: usize, text: String },
    #[error("line {line}: invalid coordinate `{value}`")]
    Coordinate { line: usize, value: String },
    #[error("line {line}: duplicate id `{id}`")]
    DuplicateId { line: usize, id: String },
    #[error("line {line}: unknown member `{id}`")]
    UnknownMember { line: usize, id: String },
}

pub fn looks_like_tree_text(input: &str) -> bool {
    meaningful_lines(input)
        .next()
        .map(|(_, line)| HEADER_RE.is_match(line))
        .unwrap_or(false)
}

pub fn parse_tree(input: &str) -> Result<TreeDocument, ParseError> {
    let mut lines = meaningful_lines(input);
    let Some((_, header)) = lines.next() else {
        return Err(ParseError::MissingHeader);
    };
    let Some(caps) = HEADER_RE.captures(header) else {
        return Err(ParseError::MissingHeader);
    };

    let mut doc = TreeDocument::new(caps.get(1).map(|m| m.as_str()).unwrap_or("tree"));
    let mut ids: HashSet<String> = HashSet::new();
    let mut pending: Vec<(usize, Relationship)> = Vec::new();
    let mut next_rel = 0usize;

    for (line_no, line) in lines {
        if let Some(caps) = MEMBER_RE.captures(line) {
            let id = caps[1].to_string();
            if !ids.insert(id.clone()) {
                return Err(ParseError::DuplicateId { line: line_no, id });
            }
            let display = if let Some(character) = caps.get(2) {
                DisplayIdentity::Character {
                    character_id: character.as_str().to_string(),
                }
            } else {
                DisplayIdentity::Inline {
                    name: caps.get(3).map(|m| m.as_str()).unwrap_or(&id).to_string(),
                    date: caps.get(4).map(|m| m.as_str().to_string()),
                }
            };
            let mut member = Member::new(&id, display);
            if let (Some(x), Some(y)) = (caps.get(5), caps.get(6)) {
                member.x = parse_coord(x.as_str(), line_no)?;
                member.y = parse_coord(y.as_str(), line_no)?;
            }
            doc.members.push(member);
            continue;
        }

        if let Some(caps) = LINK_RE.captures(line) {
            let id = match caps.get(5) {
                Some(explicit) => explicit.as_str().to_string(),
                None => loop {
                    next_rel += 1;
                    let candidate = format!("r{next_rel}");
                    if !ids.contains(&candidate) {
                        break candidate;
                    }
                },
            };
            if !ids.insert(id.clone()) {
                return Err(ParseError::DuplicateId { line: line_no, id });
            }
            let mut rel = Relationship::new(&id, &caps[1], &caps[2], RelationshipKind::from(&caps[3]));
            rel.custom_label = caps.get(4).map(|m| m.as_str().to_string());
            pending.push((line_no, rel));
            continue;
        }

        return Err(ParseError::Syntax {
            line: line_no,
            text: line.to_string(),
        });
    }

    // members may be declared after the links that use them
    for (line_no, rel) in pending {
        for endpoint in [&rel.from, &rel.to] {
            if doc.member(endpoint).is_none() {
                return Err(ParseError::UnknownMember {
                    line: line_no,
                    id: endpoint.clone(),
                });
            }
        }
        doc.relationships.push(rel);
    }

    Ok(doc)
}

fn meaningful_lines(input: &str) -> impl Iterator<Item = (usize, &str)> {
    input
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with("%%"))
}

fn parse_coord(value: &str, line: usize) -> Result<f32, ParseError> {
    value.parse::<f32>().map_err(|_| ParseError::Coordinate {
        line,
        value: value.to_string(),
    })
}
