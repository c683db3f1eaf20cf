//! Augmentation orchestrator.
//!
//! # Responsibility
//! - Run at most one augmentation per entry at a time.
//! - Merge title/tag suggestions back through the entry store.
//! - Hold ephemeral display state: summaries and last errors per entry.
//!
//! # Invariants
//! - Per-entry state is `Idle -> Processing -> Idle`, on success, failure or
//!   when the caller drops the future.
//! - The store lock is never held across a provider call, so manual edits
//!   proceed while a request is in flight.
//! - A failed call writes no entry fields.
//! - Results for an entry deleted mid-flight are discarded, never
//!   resurrected.

use crate::ai::client::{AugmentationClient, AugmentationError};
use crate::ai::provider::TextProvider;
use crate::clock::Clock;
use crate::model::entry::{Entry, EntryId};
use crate::repo::slot_repo::SlotRepository;
use crate::service::entry_store::{EntryStore, MergeOutcome};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

const MAX_CONTEXT_CHARS: usize = 30_000;
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Which augmentation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AugmentKind {
    Inspire,
    Summarize,
}

impl AugmentKind {
    fn event(self) -> &'static str {
        match self {
            Self::Inspire => "augment_inspire",
            Self::Summarize => "augment_summarize",
        }
    }
}

/// Per-entry processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugmentState {
    Idle,
    Processing(AugmentKind),
}

/// Result of one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AugmentOutcome {
    /// Unknown entry or blank content; no provider call was made.
    Skipped,
    /// Another augmentation for this entry is still in flight.
    Busy,
    /// The result was merged (inspire) or surfaced (summarize).
    Applied,
    /// The entry was deleted while the call was in flight.
    Discarded,
    /// The call or the write-back failed; the message is user-facing.
    Failed(String),
}

/// Result of a contextual question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Answered(String),
    /// Blank question; no provider call was made.
    Skipped,
    Failed(String),
}

/// Coordinates augmentation calls against an [`EntryStore`].
pub struct AugmentService<P: TextProvider> {
    client: AugmentationClient<P>,
    in_flight: Mutex<HashMap<EntryId, AugmentKind>>,
    summaries: Mutex<HashMap<EntryId, String>>,
    errors: Mutex<HashMap<EntryId, String>>,
}

/// Marks one entry as processing; clears the mark on drop.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<EntryId, AugmentKind>>,
    id: EntryId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(&self.id);
    }
}

impl<P: TextProvider> AugmentService<P> {
    pub fn new(client: AugmentationClient<P>) -> Self {
        Self {
            client,
            in_flight: Mutex::new(HashMap::new()),
            summaries: Mutex::new(HashMap::new()),
            errors: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &AugmentationClient<P> {
        &self.client
    }

    pub fn state(&self, id: &EntryId) -> AugmentState {
        lock(&self.in_flight)
            .get(id)
            .copied()
            .map_or(AugmentState::Idle, AugmentState::Processing)
    }

    /// Current summary shown for `id`, if any.
    pub fn summary(&self, id: &EntryId) -> Option<String> {
        lock(&self.summaries).get(id).cloned()
    }

    pub fn dismiss_summary(&self, id: &EntryId) -> bool {
        lock(&self.summaries).remove(id).is_some()
    }

    /// Message of the last failed augmentation for `id`.
    pub fn last_error(&self, id: &EntryId) -> Option<String> {
        lock(&self.errors).get(id).cloned()
    }

    pub fn clear_error(&self, id: &EntryId) -> bool {
        lock(&self.errors).remove(id).is_some()
    }

    /// Drops summaries and errors held for entries no longer in `store`.
    ///
    /// Every trigger runs this first, so deleted entries do not accumulate.
    pub fn forget_deleted<R: SlotRepository, C: Clock>(&self, store: &EntryStore<R, C>) {
        lock(&self.summaries).retain(|id, _| store.get(id).is_some());
        lock(&self.errors).retain(|id, _| store.get(id).is_some());
    }

    /// Suggests a title and tags for the entry and merges them.
    ///
    /// The merge runs against the entry as it is when the call resolves:
    /// the title is filled only if still blank, tags are unioned.
    pub async fn inspire<R, C>(&self, store: &Mutex<EntryStore<R, C>>, id: &EntryId) -> AugmentOutcome
    where
        R: SlotRepository,
        C: Clock,
    {
        let kind = AugmentKind::Inspire;
        let Some(content) = self.snapshot_content(store, id) else {
            return AugmentOutcome::Skipped;
        };
        let Some(_guard) = self.begin(id, kind) else {
            return AugmentOutcome::Busy;
        };

        let started_at = Instant::now();
        let suggestion = match self.client.suggest_title_and_tags(&content).await {
            Ok(suggestion) => suggestion,
            Err(err) => return self.fail_call(id, kind, &err, started_at),
        };

        let merged = lock(store).merge_suggestion(id, &suggestion.title, &suggestion.tags);
        match merged {
            Ok(MergeOutcome::Missing) => self.discard(id, kind, started_at),
            Ok(outcome) => {
                self.clear_error(id);
                info!(
                    "event={} module=augment status=ok changed={} duration_ms={}",
                    kind.event(),
                    outcome == MergeOutcome::Changed,
                    started_at.elapsed().as_millis()
                );
                AugmentOutcome::Applied
            }
            Err(err) => {
                let message = err.to_string();
                warn!(
                    "event={} module=augment status=error error_code=merge_persist_failed error={}",
                    kind.event(),
                    message
                );
                lock(&self.errors).insert(id.clone(), message.clone());
                AugmentOutcome::Failed(message)
            }
        }
    }

    /// Summarizes the entry into ephemeral display state.
    ///
    /// The summary is never written into the entry.
    pub async fn summarize<R, C>(
        &self,
        store: &Mutex<EntryStore<R, C>>,
        id: &EntryId,
    ) -> AugmentOutcome
    where
        R: SlotRepository,
        C: Clock,
    {
        let kind = AugmentKind::Summarize;
        let Some(content) = self.snapshot_content(store, id) else {
            return AugmentOutcome::Skipped;
        };
        let Some(_guard) = self.begin(id, kind) else {
            return AugmentOutcome::Busy;
        };

        let started_at = Instant::now();
        let summary = match self.client.summarize(&content).await {
            Ok(summary) => summary,
            Err(err) => return self.fail_call(id, kind, &err, started_at),
        };

        if lock(store).get(id).is_none() {
            return self.discard(id, kind, started_at);
        }
        lock(&self.summaries).insert(id.clone(), summary);
        self.clear_error(id);
        info!(
            "event={} module=augment status=ok duration_ms={}",
            kind.event(),
            started_at.elapsed().as_millis()
        );
        AugmentOutcome::Applied
    }

    /// Answers a question grounded in the entries matching `filter`.
    pub async fn ask<R, C>(
        &self,
        store: &Mutex<EntryStore<R, C>>,
        question: &str,
        filter: &str,
    ) -> AnswerOutcome
    where
        R: SlotRepository,
        C: Clock,
    {
        if question.trim().is_empty() {
            return AnswerOutcome::Skipped;
        }
        let (context, included) = {
            let store = lock(store);
            self.forget_deleted(&store);
            build_context(&store.view(filter))
        };

        let started_at = Instant::now();
        match self.client.answer_with_context(question.trim(), &context).await {
            Ok(answer) => {
                info!(
                    "event=augment_ask module=augment status=ok entries={} duration_ms={}",
                    included,
                    started_at.elapsed().as_millis()
                );
                AnswerOutcome::Answered(answer)
            }
            Err(err) => {
                warn!(
                    "event=augment_ask module=augment status=error entries={} error={}",
                    included, err
                );
                AnswerOutcome::Failed(err.to_string())
            }
        }
    }

    fn snapshot_content<R: SlotRepository, C: Clock>(
        &self,
        store: &Mutex<EntryStore<R, C>>,
        id: &EntryId,
    ) -> Option<String> {
        let store = lock(store);
        self.forget_deleted(&store);
        store
            .get(id)
            .filter(|entry| !entry.has_blank_content())
            .map(|entry| entry.content.clone())
    }

    fn begin(&self, id: &EntryId, kind: AugmentKind) -> Option<InFlightGuard<'_>> {
        let mut in_flight = lock(&self.in_flight);
        if let Some(running) = in_flight.get(id) {
            info!(
                "event={} module=augment status=busy running={}",
                kind.event(),
                running.event()
            );
            return None;
        }
        in_flight.insert(id.clone(), kind);
        Some(InFlightGuard {
            in_flight: &self.in_flight,
            id: id.clone(),
        })
    }

    fn fail_call(
        &self,
        id: &EntryId,
        kind: AugmentKind,
        err: &AugmentationError,
        started_at: Instant,
    ) -> AugmentOutcome {
        let message = err.to_string();
        warn!(
            "event={} module=augment status=error duration_ms={} error={}",
            kind.event(),
            started_at.elapsed().as_millis(),
            message
        );
        lock(&self.errors).insert(id.clone(), message.clone());
        AugmentOutcome::Failed(message)
    }

    fn discard(&self, id: &EntryId, kind: AugmentKind, started_at: Instant) -> AugmentOutcome {
        lock(&self.summaries).remove(id);
        lock(&self.errors).remove(id);
        info!(
            "event={} module=augment status=discarded reason=entry_deleted duration_ms={}",
            kind.event(),
            started_at.elapsed().as_millis()
        );
        AugmentOutcome::Discarded
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Formats entries into one context block of at most `MAX_CONTEXT_CHARS`
/// characters.
///
/// An entry that does not fit whole is cut on a character boundary and ends
/// the context. Returns the context and how many entries it includes.
fn build_context(entries: &[&Entry]) -> (String, usize) {
    let mut context = String::new();
    let mut used = 0;
    let mut included = 0;
    for entry in entries {
        let separator = if included > 0 { CONTEXT_SEPARATOR } else { "" };
        let remaining = MAX_CONTEXT_CHARS.saturating_sub(used + separator.chars().count());
        if remaining == 0 {
            break;
        }
        let tags = entry.tags.iter().collect::<Vec<_>>().join(", ");
        let block = format!(
            "## {} ({})\nTags: {}\n{}",
            entry.display_title(),
            entry.kind,
            tags,
            entry.content
        );
        let block_chars = block.chars().count();
        context.push_str(separator);
        included += 1;
        if block_chars > remaining {
            context.extend(block.chars().take(remaining));
            break;
        }
        context.push_str(&block);
        used += separator.chars().count() + block_chars;
    }
    (context, included)
}

#[cfg(test)]
mod tests {
    use super::{build_context, MAX_CONTEXT_CHARS};
    use crate::model::entry::{Entry, EntryType};
    use crate::model::tags::TagSet;

    #[test]
    fn context_lists_title_type_tags_and_content() {
        let mut entry = Entry::new(EntryType::Blog, 0);
        entry.title = "Trip".to_string();
        entry.content = "Went hiking.".to_string();
        entry.tags = ["travel", "outdoors"].iter().collect::<TagSet>();

        let (context, included) = build_context(&[&entry]);
        assert_eq!(included, 1);
        assert_eq!(context, "## Trip (blog)\nTags: travel, outdoors\nWent hiking.");
    }

    #[test]
    fn context_cuts_the_entry_that_crosses_the_limit() {
        let mut big = Entry::new(EntryType::Note, 0);
        big.content = "x".repeat(MAX_CONTEXT_CHARS - 100);
        let mut next = Entry::new(EntryType::Note, 0);
        next.content = "y".repeat(200);
        let mut last = Entry::new(EntryType::Note, 0);
        last.content = "z".to_string();

        let (context, included) = build_context(&[&big, &next, &last]);
        assert_eq!(included, 2);
        assert_eq!(context.chars().count(), MAX_CONTEXT_CHARS);
        assert!(context.ends_with('y'));
        assert!(!context.contains('z'));
    }

    #[test]
    fn oversized_entry_is_cut_on_a_char_boundary() {
        let mut entry = Entry::new(EntryType::Blog, 0);
        entry.title = "Café".to_string();
        entry.content = "é".repeat(MAX_CONTEXT_CHARS);

        let (context, included) = build_context(&[&entry]);
        assert_eq!(included, 1);
        assert!(context.starts_with("## Café (blog)"));
        assert_eq!(context.chars().count(), MAX_CONTEXT_CHARS);
        assert!(context.len() > MAX_CONTEXT_CHARS);
    }
}
