use serde_json::Value;
use std::cell::Cell;
use zenspace_core::repo::entry_slot::EntrySlot;
use zenspace_core::{
    EntryPatch, EntryStore, EntryType, LoadState, ManualClock, MemorySlotRepository, RepoError,
    RepoResult, SlotRepository, StoreError, TagSet,
};

const KEY: &str = "zenspace_data_v1";

fn open_on(repo: &MemorySlotRepository, clock: &ManualClock) -> EntryStore<MemorySlotRepository, ManualClock> {
    EntryStore::open_with_clock(EntrySlot::new(repo.clone(), KEY), clock.clone()).unwrap()
}

fn empty_store() -> (
    EntryStore<MemorySlotRepository, ManualClock>,
    MemorySlotRepository,
    ManualClock,
) {
    let repo = MemorySlotRepository::with_value(KEY, "[]");
    let clock = ManualClock::new(1_000);
    let store = open_on(&repo, &clock);
    (store, repo, clock)
}

fn stored_json(repo: &MemorySlotRepository) -> Value {
    let raw = repo.read_slot(KEY).unwrap().unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn create_note_on_empty_store_yields_blank_selected_entry_first() {
    let (mut store, _, _) = empty_store();
    let older = store.create(EntryType::Blog).unwrap();

    let entry = store.create(EntryType::Note).unwrap();

    assert!(!entry.id.as_str().is_empty());
    assert_eq!(entry.title, "");
    assert_eq!(entry.content, "");
    assert!(entry.tags.is_empty());
    assert_eq!(entry.kind, EntryType::Note);
    assert_eq!(entry.created_at, entry.updated_at);
    assert_eq!(store.selected_id(), Some(&entry.id));
    assert_eq!(store.entries()[0].id, entry.id);
    assert_eq!(store.entries()[1].id, older.id);
}

#[test]
fn missing_slot_seeds_and_persists_welcome_entry() {
    let repo = MemorySlotRepository::new();
    let store = open_on(&repo, &ManualClock::new(5));

    assert_eq!(store.load_state(), &LoadState::Seeded);
    assert_eq!(store.len(), 1);
    let welcome = store.selected().unwrap();
    assert_eq!(welcome.title, "Welcome to ZenSpace");
    assert_eq!(welcome.kind, EntryType::Note);
    assert_eq!(welcome.tags.as_slice(), ["welcome", "guide"]);

    let persisted = stored_json(&repo);
    assert_eq!(persisted.as_array().unwrap().len(), 1);
    assert_eq!(persisted[0]["title"], "Welcome to ZenSpace");
}

#[test]
fn corrupt_slot_is_backed_up_and_reseeded() {
    let repo = MemorySlotRepository::with_value(KEY, "[{\"id\":");
    let store = open_on(&repo, &ManualClock::new(5));

    assert!(matches!(store.load_state(), LoadState::Recovered { .. }));
    assert_eq!(store.len(), 1);
    assert_eq!(
        repo.read_slot("zenspace_data_v1.corrupt").unwrap().as_deref(),
        Some("[{\"id\":")
    );
    assert_eq!(stored_json(&repo).as_array().unwrap().len(), 1);
}

#[test]
fn entries_survive_reopen_field_for_field() {
    let (mut store, repo, clock) = empty_store();
    let entry = store.create(EntryType::Blog).unwrap();
    clock.advance(50);
    store
        .update(
            &entry.id,
            EntryPatch {
                title: Some("Trip".to_string()),
                content: Some("Went hiking.".to_string()),
                kind: None,
                tags: Some(["travel", "outdoors"].iter().collect::<TagSet>()),
            },
        )
        .unwrap();

    let reopened = open_on(&repo, &clock);
    assert_eq!(reopened.load_state(), &LoadState::Loaded);
    assert_eq!(reopened.entries(), store.entries());
    assert_eq!(reopened.selected_id(), Some(&entry.id));
}

#[test]
fn update_ignores_unknown_or_unselected_ids() {
    let (mut store, repo, _) = empty_store();
    let first = store.create(EntryType::Note).unwrap();
    let second = store.create(EntryType::Note).unwrap();
    let before = stored_json(&repo);

    assert!(!store.update(&first.id, EntryPatch::title("nope")).unwrap());
    let unknown = zenspace_core::EntryId::parse("missing").unwrap();
    assert!(!store.update(&unknown, EntryPatch::title("nope")).unwrap());

    assert_eq!(store.get(&first.id).unwrap().title, "");
    assert_eq!(store.selected_id(), Some(&second.id));
    assert_eq!(stored_json(&repo), before);
}

#[test]
fn update_never_rewrites_identity_fields_from_patch_keys() {
    let (mut store, _, clock) = empty_store();
    let entry = store.create(EntryType::Note).unwrap();
    clock.advance(10);
    let patch: EntryPatch = serde_json::from_str(
        r#"{"id":"hijack","createdAt":1,"updatedAt":2,"title":"Kept"}"#,
    )
    .unwrap();

    assert!(store.update(&entry.id, patch).unwrap());
    let updated = store.get(&entry.id).unwrap();
    assert_eq!(updated.id, entry.id);
    assert_eq!(updated.created_at, entry.created_at);
    assert_eq!(updated.updated_at, 1_010);
    assert_eq!(updated.title, "Kept");
}

#[test]
fn updated_at_never_precedes_created_at_when_clock_goes_back() {
    let (mut store, _, clock) = empty_store();
    let entry = store.create(EntryType::Note).unwrap();
    clock.set(10);

    store.update(&entry.id, EntryPatch::content("x")).unwrap();
    let updated = store.get(&entry.id).unwrap();
    assert!(updated.updated_at >= updated.created_at);
}

#[test]
fn deleting_selected_entry_moves_selection_to_first_remaining() {
    let (mut store, _, _) = empty_store();
    let a = store.create(EntryType::Note).unwrap();
    let b = store.create(EntryType::Note).unwrap();
    let c = store.create(EntryType::Note).unwrap();

    assert!(store.delete(&c.id).unwrap());
    assert_eq!(store.selected_id(), Some(&b.id));

    store.select(&a.id);
    assert!(store.delete(&b.id).unwrap());
    assert_eq!(store.selected_id(), Some(&a.id));

    assert!(store.delete(&a.id).unwrap());
    assert_eq!(store.selected_id(), None);
}

#[test]
fn deleting_last_entry_persists_empty_collection() {
    let (mut store, repo, _) = empty_store();
    let entry = store.create(EntryType::Note).unwrap();

    store.delete(&entry.id).unwrap();

    assert_eq!(repo.read_slot(KEY).unwrap().as_deref(), Some("[]"));
}

#[test]
fn deleting_unknown_id_is_a_no_op() {
    let (mut store, repo, _) = empty_store();
    store.create(EntryType::Note).unwrap();
    let before = stored_json(&repo);

    let unknown = zenspace_core::EntryId::parse("ghost").unwrap();
    assert!(!store.delete(&unknown).unwrap());
    assert_eq!(store.len(), 1);
    assert_eq!(stored_json(&repo), before);
}

#[test]
fn declined_confirmation_keeps_entry_and_slot() {
    let (mut store, repo, _) = empty_store();
    let entry = store.create(EntryType::Note).unwrap();
    let before = stored_json(&repo);
    let asked = Cell::new(0);
    let decline = |prompt: &str| {
        asked.set(asked.get() + 1);
        assert_eq!(prompt, "Are you sure you want to delete this?");
        false
    };

    assert!(!store.delete_confirmed(&entry.id, &decline).unwrap());
    assert_eq!(asked.get(), 1);
    assert_eq!(store.len(), 1);
    assert_eq!(stored_json(&repo), before);

    assert!(store.delete_confirmed(&entry.id, &|_: &str| true).unwrap());
    assert!(store.is_empty());
}

#[test]
fn view_filters_case_insensitively_and_sorts_by_recency() {
    let (mut store, _, clock) = empty_store();
    let rust = store.create(EntryType::Note).unwrap();
    store.update(&rust.id, EntryPatch::title("Learning Rust")).unwrap();
    clock.advance(10);
    let garden = store.create(EntryType::Blog).unwrap();
    store
        .update(&garden.id, EntryPatch::tags(["garden"].iter().collect()))
        .unwrap();

    let all: Vec<_> = store.view("").into_iter().map(|e| e.id.clone()).collect();
    assert_eq!(all, vec![garden.id.clone(), rust.id.clone()]);

    let hits: Vec<_> = store.view("  RUST ").into_iter().map(|e| e.id.clone()).collect();
    assert_eq!(hits, vec![rust.id]);
    assert!(store.view("nothing-matches").is_empty());
}

struct FailingRepo {
    inner: MemorySlotRepository,
    fail_writes: Cell<bool>,
}

impl SlotRepository for FailingRepo {
    fn read_slot(&self, key: &str) -> RepoResult<Option<String>> {
        self.inner.read_slot(key)
    }

    fn write_slot(&self, key: &str, value: &str) -> RepoResult<()> {
        if self.fail_writes.get() {
            return Err(RepoError::InvalidData("disk full".to_string()));
        }
        self.inner.write_slot(key, value)
    }

    fn remove_slot(&self, key: &str) -> RepoResult<bool> {
        self.inner.remove_slot(key)
    }
}

#[test]
fn persist_failure_is_reported_and_memory_keeps_the_change() {
    let inner = MemorySlotRepository::with_value(KEY, "[]");
    let repo = FailingRepo {
        inner: inner.clone(),
        fail_writes: Cell::new(true),
    };
    let mut store =
        EntryStore::open_with_clock(EntrySlot::new(repo, KEY), ManualClock::new(0)).unwrap();

    let err = store.create(EntryType::Note).unwrap_err();
    assert!(matches!(err, StoreError::Persist(_)));
    assert_eq!(store.len(), 1);
    assert_eq!(inner.read_slot(KEY).unwrap().as_deref(), Some("[]"));
}

struct BackupRejectingRepo(MemorySlotRepository);

impl SlotRepository for BackupRejectingRepo {
    fn read_slot(&self, key: &str) -> RepoResult<Option<String>> {
        self.0.read_slot(key)
    }

    fn write_slot(&self, key: &str, value: &str) -> RepoResult<()> {
        if key.ends_with(".corrupt") {
            return Err(RepoError::InvalidData("backup rejected".to_string()));
        }
        self.0.write_slot(key, value)
    }

    fn remove_slot(&self, key: &str) -> RepoResult<bool> {
        self.0.remove_slot(key)
    }
}

#[test]
fn corrupt_slot_is_never_overwritten_when_backup_fails() {
    let inner = MemorySlotRepository::with_value(KEY, r#"[{"id":"precious""#);
    let slot = EntrySlot::new(BackupRejectingRepo(inner.clone()), KEY);

    let err = EntryStore::open_with_clock(slot, ManualClock::new(0))
        .err()
        .unwrap();

    assert!(matches!(err, StoreError::Open(_)));
    assert_eq!(
        inner.read_slot(KEY).unwrap().as_deref(),
        Some(r#"[{"id":"precious""#)
    );
    assert_eq!(inner.keys(), vec![KEY.to_string()]);
}
