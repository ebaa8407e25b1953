use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod edit;
pub mod tree;

pub use tree::{OutlineNode, build_tree, flatten};

pub const DEFAULT_TITLE: &str = "Untitled";

/// A single bookmark in its flat, editable form. The position in the containing list is the
/// display order and `level` is the nesting depth, 0 being top-level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineItem {
    pub id: String,
    pub title: String,
    pub page_index: usize,
    pub level: usize,
}

/// The permissive shape an outline arrives in from an outline file or an editor. Every field is
/// optional and page indices may be negative; [`RawOutlineItem::normalize`] applies the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOutlineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
}

impl RawOutlineItem {
    pub fn normalize(self, ids: &mut dyn IdGenerator) -> OutlineItem {
        OutlineItem {
            id: self.id.unwrap_or_else(|| ids.next_id()),
            title: self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            page_index: clamp_non_negative(self.page_index),
            level: clamp_non_negative(self.level),
        }
    }
}

impl From<OutlineItem> for RawOutlineItem {
    fn from(item: OutlineItem) -> Self {
        RawOutlineItem {
            id: Some(item.id),
            title: Some(item.title),
            page_index: Some(item.page_index as i64),
            level: Some(item.level as i64),
        }
    }
}

fn clamp_non_negative(value: Option<i64>) -> usize {
    value.map(|v| v.max(0) as usize).unwrap_or(0)
}

/// Normalizes a whole outline. Items are kept in order, missing fields receive their defaults.
pub fn normalize_items(raw: Vec<RawOutlineItem>, ids: &mut dyn IdGenerator) -> Vec<OutlineItem> {
    raw.into_iter().map(|item| item.normalize(ids)).collect()
}

/// Source of fresh item ids. Passed in explicitly so that tree building and extraction stay
/// deterministic under test.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Hands out `prefix-0`, `prefix-1`, ...
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: usize,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("item")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineViolation {
    DuplicateId { index: usize, id: String },
    FirstLevelNotZero { level: usize },
    LevelSkip { index: usize, level: usize, previous: usize },
}

impl fmt::Display for OutlineViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlineViolation::DuplicateId { index, id } => {
                write!(f, "item {index} reuses the id {id:?}")
            }
            OutlineViolation::FirstLevelNotZero { level } => {
                write!(f, "the first item is at level {level} instead of 0")
            }
            OutlineViolation::LevelSkip {
                index,
                level,
                previous,
            } => write!(
                f,
                "item {index} is at level {level} but follows an item at level {previous}"
            ),
        }
    }
}

/// Lists every place where `items` breaks the flat outline invariants. An empty result means
/// [`build_tree`] followed by [`flatten`] reproduces the list exactly.
pub fn validate(items: &[OutlineItem]) -> Vec<OutlineViolation> {
    let mut violations = Vec::new();
    let mut seen = HashSet::new();

    if let Some(first) = items.first()
        && first.level != 0
    {
        violations.push(OutlineViolation::FirstLevelNotZero { level: first.level });
    }

    for (index, item) in items.iter().enumerate() {
        if !seen.insert(item.id.as_str()) {
            violations.push(OutlineViolation::DuplicateId {
                index,
                id: item.id.clone(),
            });
        }
        if index > 0 {
            let previous = items[index - 1].level;
            if item.level > previous + 1 {
                violations.push(OutlineViolation::LevelSkip {
                    index,
                    level: item.level,
                    previous,
                });
            }
        }
    }

    violations
}
