//! Insertion-ordered tag set.
//!
//! # Responsibility
//! - Hold an entry's labels with set semantics enforced by construction.
//! - Keep insertion order so list/detail displays stay stable.
//!
//! # Invariants
//! - No two stored tags are equal (exact, case-sensitive comparison).
//! - Stored tags are trimmed and never blank.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejection reasons for persisted tag arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSetError {
    /// The same tag appears more than once.
    Duplicate(String),
    /// A tag is empty or whitespace-only.
    Blank,
}

impl Display for TagSetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate(tag) => write!(f, "duplicate tag `{tag}`"),
            Self::Blank => write!(f, "tag must not be blank"),
        }
    }
}

impl Error for TagSetError {}

/// Set of free-text labels attached to an entry.
///
/// Serialized as a plain JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one tag.
    ///
    /// Returns `true` when the set changed. Blank input and exact duplicates
    /// are ignored.
    pub fn insert(&mut self, tag: impl AsRef<str>) -> bool {
        let trimmed = tag.as_ref().trim();
        if trimmed.is_empty() || self.contains(trimmed) {
            return false;
        }
        self.tags.push(trimmed.to_string());
        true
    }

    /// Removes one tag. Returns `true` when it was present.
    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|current| current != tag);
        self.tags.len() != before
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|current| current == tag)
    }

    /// Adds every tag of `other` that is not already present.
    ///
    /// Existing tags keep their position; new ones are appended in `other`'s
    /// order. Returns `true` when at least one tag was added.
    pub fn union<I, S>(&mut self, other: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut changed = false;
        for tag in other {
            changed |= self.insert(tag);
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.union(iter);
        set
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

impl TryFrom<Vec<String>> for TagSet {
    type Error = TagSetError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        let mut set = Self::new();
        for tag in value {
            if tag.trim().is_empty() {
                return Err(TagSetError::Blank);
            }
            if set.contains(&tag) {
                return Err(TagSetError::Duplicate(tag));
            }
            // Stored verbatim so persisted data round-trips exactly.
            set.tags.push(tag);
        }
        Ok(set)
    }
}

impl From<TagSet> for Vec<String> {
    fn from(value: TagSet) -> Self {
        value.tags
    }
}

#[cfg(test)]
mod tests {
    use super::{TagSet, TagSetError};

    #[test]
    fn insert_suppresses_exact_duplicates_but_not_case_variants() {
        let mut tags = TagSet::new();
        assert!(tags.insert("rust"));
        assert!(!tags.insert("rust"));
        assert!(tags.insert("Rust"));
        assert_eq!(tags.as_slice(), ["rust".to_string(), "Rust".to_string()]);
    }

    #[test]
    fn insert_trims_and_ignores_blank_values() {
        let mut tags = TagSet::new();
        assert!(!tags.insert("   "));
        assert!(tags.insert("  ideas "));
        assert!(tags.contains("ideas"));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn union_keeps_existing_order_and_appends_new_tags() {
        let mut tags: TagSet = ["a", "b"].into_iter().collect();
        assert!(tags.union(["b", "c"]));
        assert_eq!(
            tags.iter().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert!(!tags.union(["a", "c"]));
    }

    #[test]
    fn remove_reports_presence() {
        let mut tags: TagSet = ["a", "b"].into_iter().collect();
        assert!(tags.remove("a"));
        assert!(!tags.remove("a"));
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn deserialize_rejects_duplicates() {
        let err = serde_json::from_str::<TagSet>(r#"["x","x"]"#).unwrap_err();
        assert!(err.to_string().contains("duplicate tag `x`"), "{err}");
        assert_eq!(
            TagSet::try_from(vec![String::new()]).unwrap_err(),
            TagSetError::Blank
        );
    }
}
