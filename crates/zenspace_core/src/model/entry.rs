//! Entry domain model.
//!
//! # Responsibility
//! - Define the canonical note/blog record owned by the entry store.
//! - Define the partial-update shape accepted by the store.
//!
//! # Invariants
//! - `id` is non-empty and never reassigned.
//! - `updated_at >= created_at`.
//! - `tags` has set semantics (see [`TagSet`]).
//!
//! # See also
//! - crate::service::entry_store

use crate::model::tags::TagSet;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Title shown for entries whose title is blank.
pub const UNTITLED: &str = "Untitled";

/// Opaque stable entry identifier.
///
/// New ids are UUID v4 strings; ids written by older stores may be any
/// non-empty string, so the type does not assume a UUID shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId(String);

impl EntryId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wraps an existing id, rejecting blank values.
    pub fn parse(value: impl Into<String>) -> Result<Self, EntryValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(EntryValidationError::EmptyId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntryId {
    type Error = EntryValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EntryId> for String {
    fn from(value: EntryId) -> Self {
        value.0
    }
}

/// Closed set of entry categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Long-form blog post.
    Blog,
    /// Quick personal note.
    Note,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Note => "note",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "blog" => Some(Self::Blog),
            "note" => Some(Self::Note),
            _ => None,
        }
    }
}

impl Display for EntryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures for entry records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    EmptyId,
    UpdatedBeforeCreated { created_at: i64, updated_at: i64 },
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "entry id must not be empty"),
            Self::UpdatedBeforeCreated {
                created_at,
                updated_at,
            } => write!(
                f,
                "updatedAt ({updated_at}) must be >= createdAt ({created_at})"
            ),
        }
    }
}

impl Error for EntryValidationError {}

/// One note or blog document.
///
/// Wire names follow the durable slot format (`type`, `createdAt`,
/// `updatedAt`). Timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "EntryRecord")]
pub struct Entry {
    pub id: EntryId,
    pub title: String,
    /// Markdown source text.
    pub content: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub tags: TagSet,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Entry {
    /// Creates an empty entry stamped with `now`.
    pub fn new(kind: EntryType, now: i64) -> Self {
        Self {
            id: EntryId::generate(),
            title: String::new(),
            content: String::new(),
            kind,
            tags: TagSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.updated_at < self.created_at {
            return Err(EntryValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    /// Title for list/detail display; blank titles show as `Untitled`.
    pub fn display_title(&self) -> &str {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            UNTITLED
        } else {
            trimmed
        }
    }

    pub fn has_blank_content(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Moves `updated_at` forward to `now`, never below `created_at`.
    pub(crate) fn touch(&mut self, now: i64) {
        self.updated_at = now.max(self.created_at);
    }
}

/// Unvalidated wire shape; converted into [`Entry`] after checks.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRecord {
    id: EntryId,
    title: String,
    content: String,
    #[serde(rename = "type")]
    kind: EntryType,
    tags: TagSet,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<EntryRecord> for Entry {
    type Error = EntryValidationError;

    fn try_from(value: EntryRecord) -> Result<Self, Self::Error> {
        let entry = Entry {
            id: value.id,
            title: value.title,
            content: value.content,
            kind: value.kind,
            tags: value.tags,
            created_at: value.created_at,
            updated_at: value.updated_at,
        };
        entry.validate()?;
        Ok(entry)
    }
}

/// Partial update for one entry.
///
/// Only user-editable fields exist here. When decoded from JSON, keys such
/// as `id`, `createdAt` or `updatedAt` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<EntryType>,
    /// Replaces the whole tag set. JSON input is normalized like
    /// [`TagSet::insert`]: duplicates and blank values are dropped.
    #[serde(default, deserialize_with = "deserialize_patch_tags")]
    pub tags: Option<TagSet>,
}

fn deserialize_patch_tags<'de, D>(deserializer: D) -> Result<Option<TagSet>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(raw.map(|tags| tags.into_iter().collect()))
}

impl EntryPatch {
    pub fn title(value: impl Into<String>) -> Self {
        Self {
            title: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn content(value: impl Into<String>) -> Self {
        Self {
            content: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn tags(value: TagSet) -> Self {
        Self {
            tags: Some(value),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.kind.is_none() && self.tags.is_none()
    }

    /// Writes the present fields into `entry`. Returns `true` when any
    /// field was supplied.
    pub(crate) fn apply_to(self, entry: &mut Entry) -> bool {
        if self.is_empty() {
            return false;
        }
        if let Some(title) = self.title {
            entry.title = title;
        }
        if let Some(content) = self.content {
            entry.content = content;
        }
        if let Some(kind) = self.kind {
            entry.kind = kind;
        }
        if let Some(tags) = self.tags {
            entry.tags = tags;
        }
        true
    }
}
