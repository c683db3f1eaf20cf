//! Entry view derivation.
//!
//! # Invariants
//! - The view is a pure function of `(entries, query)`; inputs are never
//!   mutated.
//! - Ordering is `updated_at DESC`; ties keep collection order.
//! - Matching is case-insensitive substring over title, content and tags.

use crate::model::entry::{Entry, EntryId, EntryType};
use crate::service::preview::derive_markdown_preview;

const SNIPPET_CHARS: usize = 60;
const CARD_TAGS: usize = 2;

/// Returns entries matching `query`, most recently updated first.
///
/// A blank query matches every entry.
pub fn entry_view<'a>(entries: &'a [Entry], query: &str) -> Vec<&'a Entry> {
    let needle = query.trim().to_lowercase();
    let mut view: Vec<&Entry> = entries
        .iter()
        .filter(|entry| needle.is_empty() || matches_query(entry, &needle))
        .collect();
    // `sort_by` is stable, so equal timestamps keep collection order.
    view.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    view
}

/// Returns whether `entry` matches an already lowercased, non-empty needle.
pub fn matches_query(entry: &Entry, needle: &str) -> bool {
    entry.title.to_lowercase().contains(needle)
        || entry.content.to_lowercase().contains(needle)
        || entry
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

/// Compact list item for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCard {
    pub id: EntryId,
    pub kind: EntryType,
    /// Title, or `Untitled` when blank.
    pub title: String,
    /// First characters of the content as plain text.
    pub snippet: String,
    /// Target of the first image in the content.
    pub image: Option<String>,
    /// Leading tags shown on the card.
    pub tags: Vec<String>,
    /// Number of tags not shown in `tags`.
    pub more_tags: usize,
    pub updated_at: i64,
}

impl EntryCard {
    pub fn from_entry(entry: &Entry) -> Self {
        let tags: Vec<String> = entry
            .tags
            .iter()
            .take(CARD_TAGS)
            .map(str::to_string)
            .collect();
        let preview = derive_markdown_preview(&entry.content, SNIPPET_CHARS);
        Self {
            id: entry.id.clone(),
            kind: entry.kind,
            title: entry.display_title().to_string(),
            snippet: preview.text.unwrap_or_default(),
            image: preview.image,
            more_tags: entry.tags.len().saturating_sub(tags.len()),
            tags,
            updated_at: entry.updated_at,
        }
    }
}

/// Runs [`entry_view`] and projects each hit to an [`EntryCard`].
pub fn entry_cards(entries: &[Entry], query: &str) -> Vec<EntryCard> {
    entry_view(entries, query)
        .into_iter()
        .map(EntryCard::from_entry)
        .collect()
}
