//! Entry store: canonical collection, selection and persistence.
//!
//! # Responsibility
//! - Own the live entry collection and the selected-entry reference.
//! - Apply create/update/delete and write the whole collection back to the
//!   durable slot after every successful mutation.
//! - Recover from a missing or corrupt slot by seeding a welcome entry.
//!
//! # Invariants
//! - Entry ids are unique; `id` and `created_at` never change after creation.
//! - `updated_at >= created_at` after every mutation.
//! - Selection is a back-reference by id; a dangling id reads as "none".
//! - An empty collection is only written after an explicit delete.

use crate::clock::{Clock, SystemClock};
use crate::model::entry::{Entry, EntryId, EntryPatch, EntryType};
use crate::model::tags::TagSet;
use crate::repo::entry_slot::{EntrySlot, LoadError};
use crate::repo::slot_repo::{RepoError, SlotRepository};
use crate::search::view::entry_view;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

const WELCOME_TITLE: &str = "Welcome to ZenSpace";
const WELCOME_CONTENT: &str = "# Getting Started\n\n\
This is your personal space for writing and thinking.\n\n\
### Features\n\
- AI-powered summaries\n\
- Catchy title generation\n\
- Minimalist Markdown-ready editor\n\
- Instant search";
const WELCOME_TAGS: [&str; 2] = ["welcome", "guide"];

pub type StoreResult<T> = Result<T, StoreError>;

/// Entry store error.
#[derive(Debug)]
pub enum StoreError {
    /// The durable slot could not be read while opening the store.
    Open(RepoError),
    /// The mutation was applied in memory but writing the slot failed.
    Persist(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(err) => write!(f, "failed to open entry store: {err}"),
            Self::Persist(err) => write!(f, "failed to persist entries: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open(err) | Self::Persist(err) => Some(err),
        }
    }
}

/// How the collection was obtained when the store opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// The slot held a valid collection (possibly empty).
    Loaded,
    /// The slot was empty; the welcome entry was seeded.
    Seeded,
    /// The slot was unreadable; it was backed up and the welcome entry seeded.
    Recovered { reason: String },
}

/// Interactive yes/no gate consulted before deleting.
pub trait Confirmation {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirmation for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Result of merging an AI suggestion into an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Title and/or tags changed.
    Changed,
    /// Suggestion added nothing new.
    Unchanged,
    /// The target entry no longer exists.
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Create,
    Update,
    Delete,
    Merge,
    Seed,
}

impl Mutation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Merge => "merge",
            Self::Seed => "seed",
        }
    }
}

/// Coordinator owning entries, selection and the durable slot.
pub struct EntryStore<R: SlotRepository, C: Clock = SystemClock> {
    slot: EntrySlot<R>,
    clock: C,
    entries: Vec<Entry>,
    selected: Option<EntryId>,
    load_state: LoadState,
}

impl<R: SlotRepository> EntryStore<R> {
    /// Opens the store with wall-clock timestamps.
    pub fn open(slot: EntrySlot<R>) -> StoreResult<Self> {
        Self::open_with_clock(slot, SystemClock)
    }
}

impl<R: SlotRepository, C: Clock> EntryStore<R, C> {
    /// Loads the collection from `slot`, seeding on `NotFound`/`CorruptState`.
    ///
    /// # Errors
    /// - `Open` when the slot storage cannot be read, or a corrupt value
    ///   could not be backed up. The slot is left untouched in that case.
    /// - `Persist` when the seeded collection cannot be written.
    pub fn open_with_clock(slot: EntrySlot<R>, clock: C) -> StoreResult<Self> {
        let (entries, load_state) = match slot.load() {
            Ok(entries) => (entries, LoadState::Loaded),
            Err(LoadError::NotFound) => (Vec::new(), LoadState::Seeded),
            Err(LoadError::CorruptState(reason)) => {
                warn!(
                    "event=store_open module=store status=recovered backup_key={}",
                    slot.backup_key()
                );
                (Vec::new(), LoadState::Recovered { reason })
            }
            Err(LoadError::Repo(err)) => return Err(StoreError::Open(err)),
        };

        let mut store = Self {
            slot,
            clock,
            selected: entries.first().map(|entry| entry.id.clone()),
            entries,
            load_state,
        };

        if store.load_state != LoadState::Loaded {
            let welcome = store.welcome_entry();
            store.selected = Some(welcome.id.clone());
            store.entries.push(welcome);
            store.persist(Mutation::Seed)?;
        }

        info!(
            "event=store_open module=store status=ok entries={} load_state={}",
            store.entries.len(),
            store.load_state_label()
        );
        Ok(store)
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// All entries in insertion order (newest creations first).
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &EntryId) -> Option<&Entry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Selected id, or `None` when nothing live is selected.
    pub fn selected_id(&self) -> Option<&EntryId> {
        self.selected
            .as_ref()
            .filter(|id| self.position(id).is_some())
    }

    pub fn selected(&self) -> Option<&Entry> {
        self.selected_id().and_then(|id| self.get(id))
    }

    /// Selects a live entry. Returns `false` (and keeps the current
    /// selection) when `id` is unknown.
    pub fn select(&mut self, id: &EntryId) -> bool {
        if self.position(id).is_none() {
            return false;
        }
        self.selected = Some(id.clone());
        true
    }

    /// Filtered, display-ordered view for `query`.
    pub fn view(&self, query: &str) -> Vec<&Entry> {
        entry_view(&self.entries, query)
    }

    /// Creates a blank entry at the front of the collection and selects it.
    pub fn create(&mut self, kind: EntryType) -> StoreResult<Entry> {
        let entry = Entry::new(kind, self.clock.now_ms());
        self.entries.insert(0, entry.clone());
        self.selected = Some(entry.id.clone());
        info!(
            "event=entry_create module=store status=ok kind={} entries={}",
            kind,
            self.entries.len()
        );
        self.persist(Mutation::Create)?;
        Ok(entry)
    }

    /// Merges `patch` into the selected entry.
    ///
    /// Returns `false` without side effects when `id` is unknown, is not the
    /// selected entry, or the patch is empty.
    pub fn update(&mut self, id: &EntryId, patch: EntryPatch) -> StoreResult<bool> {
        if self.selected_id() != Some(id) {
            return Ok(false);
        }
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        let now = self.clock.now_ms();
        let entry = &mut self.entries[index];
        if !patch.apply_to(entry) {
            return Ok(false);
        }
        entry.touch(now);
        info!("event=entry_update module=store status=ok");
        self.persist(Mutation::Update)?;
        Ok(true)
    }

    /// Removes an entry without asking.
    ///
    /// When the removed entry was selected, selection moves to the first
    /// remaining entry, or to none.
    pub fn delete(&mut self, id: &EntryId) -> StoreResult<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        let was_selected = self.selected_id() == Some(id);
        self.entries.remove(index);
        if was_selected {
            self.selected = self.entries.first().map(|entry| entry.id.clone());
        }
        info!(
            "event=entry_delete module=store status=ok entries={}",
            self.entries.len()
        );
        self.persist(Mutation::Delete)?;
        Ok(true)
    }

    /// Removes an entry after `confirmation` approves it.
    ///
    /// A refusal leaves the store and the slot untouched.
    pub fn delete_confirmed(
        &mut self,
        id: &EntryId,
        confirmation: &dyn Confirmation,
    ) -> StoreResult<bool> {
        if self.position(id).is_none() {
            return Ok(false);
        }
        if !confirmation.confirm("Are you sure you want to delete this?") {
            info!("event=entry_delete module=store status=cancelled");
            return Ok(false);
        }
        self.delete(id)
    }

    /// Merges an AI title/tag suggestion into the entry's current state.
    ///
    /// Not gated by selection: the suggestion always targets the entry it
    /// was requested for. The title is only set while blank; tags are
    /// unioned. `updated_at` moves only when something changed.
    pub fn merge_suggestion(
        &mut self,
        id: &EntryId,
        title: &str,
        tags: &[String],
    ) -> StoreResult<MergeOutcome> {
        let Some(index) = self.position(id) else {
            return Ok(MergeOutcome::Missing);
        };

        let now = self.clock.now_ms();
        let entry = &mut self.entries[index];
        let mut changed = false;
        if entry.title.trim().is_empty() && !title.trim().is_empty() {
            entry.title = title.trim().to_string();
            changed = true;
        }
        changed |= entry.tags.union(tags);
        if !changed {
            return Ok(MergeOutcome::Unchanged);
        }
        entry.touch(now);
        self.persist(Mutation::Merge)?;
        Ok(MergeOutcome::Changed)
    }

    fn position(&self, id: &EntryId) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.id == id)
    }

    fn welcome_entry(&self) -> Entry {
        let mut entry = Entry::new(EntryType::Note, self.clock.now_ms());
        entry.title = WELCOME_TITLE.to_string();
        entry.content = WELCOME_CONTENT.to_string();
        entry.tags = WELCOME_TAGS.iter().collect::<TagSet>();
        entry
    }

    fn persist(&self, mutation: Mutation) -> StoreResult<()> {
        if self.entries.is_empty() && mutation != Mutation::Delete {
            info!(
                "event=store_persist module=store status=skipped reason=empty mutation={}",
                mutation.as_str()
            );
            return Ok(());
        }
        self.slot
            .persist(&self.entries)
            .map_err(StoreError::Persist)
    }

    fn load_state_label(&self) -> &'static str {
        match self.load_state {
            LoadState::Loaded => "loaded",
            LoadState::Seeded => "seeded",
            LoadState::Recovered { .. } => "recovered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryStore, LoadState, MergeOutcome};
    use crate::clock::ManualClock;
    use crate::model::entry::{EntryPatch, EntryType};
    use crate::repo::entry_slot::EntrySlot;
    use crate::repo::slot_repo::{MemorySlotRepository, SlotRepository};

    fn empty_store() -> (EntryStore<MemorySlotRepository, ManualClock>, ManualClock) {
        let clock = ManualClock::new(100);
        let repo = MemorySlotRepository::with_value("k", "[]");
        let store =
            EntryStore::open_with_clock(EntrySlot::new(repo, "k"), clock.clone()).unwrap();
        (store, clock)
    }

    #[test]
    fn loaded_empty_collection_is_not_rewritten() {
        let repo = MemorySlotRepository::new();
        repo.write_slot("k", "[]").unwrap();
        let store =
            EntryStore::open_with_clock(EntrySlot::new(repo.clone(), "k"), ManualClock::new(0))
                .unwrap();
        assert_eq!(store.load_state(), &LoadState::Loaded);
        assert!(store.is_empty());
        assert!(store.selected().is_none());
        assert_eq!(repo.keys(), vec!["k".to_string()]);
        assert_eq!(repo.read_slot("k").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn merge_only_fills_blank_title() {
        let (mut store, _) = empty_store();
        let entry = store.create(EntryType::Note).unwrap();
        store
            .update(&entry.id, EntryPatch::title("Mine"))
            .unwrap();

        let outcome = store
            .merge_suggestion(&entry.id, "Suggested", &["x".to_string()])
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Changed);
        let merged = store.get(&entry.id).unwrap();
        assert_eq!(merged.title, "Mine");
        assert!(merged.tags.contains("x"));
    }

    #[test]
    fn merge_without_news_keeps_timestamp() {
        let (mut store, clock) = empty_store();
        let entry = store.create(EntryType::Note).unwrap();
        store
            .merge_suggestion(&entry.id, "T", &["a".to_string()])
            .unwrap();
        clock.advance(1);
        let before = store.get(&entry.id).unwrap().updated_at;
        let outcome = store
            .merge_suggestion(&entry.id, "Other", &["a".to_string()])
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Unchanged);
        assert_eq!(store.get(&entry.id).unwrap().updated_at, before);
    }

    #[test]
    fn delete_of_unselected_entry_keeps_selection() {
        let (mut store, _) = empty_store();
        let first = store.create(EntryType::Note).unwrap();
        let second = store.create(EntryType::Blog).unwrap();
        assert_eq!(store.selected_id(), Some(&second.id));

        assert!(store.delete(&first.id).unwrap());
        assert_eq!(store.selected_id(), Some(&second.id));
    }

    #[test]
    fn select_rejects_unknown_ids() {
        let (mut store, _) = empty_store();
        let entry = store.create(EntryType::Note).unwrap();
        assert!(!store.select(&crate::model::entry::EntryId::generate()));
        assert_eq!(store.selected_id(), Some(&entry.id));
    }
}
