use rusqlite::Connection;
use zenspace_core::db::migrations::latest_version;
use zenspace_core::db::{open_db, open_db_in_memory, DbError};
use zenspace_core::repo::entry_slot::EntrySlot;
use zenspace_core::{
    EntryPatch, EntryStore, EntryType, LoadError, LoadState, SlotRepository, SqliteSlotRepository,
};

#[test]
fn fresh_database_has_slots_table_at_latest_version() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    let repo = SqliteSlotRepository::try_new(conn).unwrap();
    assert_eq!(repo.read_slot("anything").unwrap(), None);
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn store_contents_survive_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("zenspace.sqlite3");

    let id = {
        let repo = SqliteSlotRepository::try_new(open_db(&path).unwrap()).unwrap();
        let mut store = EntryStore::open(EntrySlot::with_default_key(repo)).unwrap();
        assert_eq!(store.load_state(), &LoadState::Seeded);
        let entry = store.create(EntryType::Blog).unwrap();
        store
            .update(&entry.id, EntryPatch::content("persisted body"))
            .unwrap();
        entry.id
    };

    let repo = SqliteSlotRepository::try_new(open_db(&path).unwrap()).unwrap();
    let store = EntryStore::open(EntrySlot::with_default_key(repo)).unwrap();
    assert_eq!(store.load_state(), &LoadState::Loaded);
    assert_eq!(store.len(), 2);
    assert_eq!(store.get(&id).unwrap().content, "persisted body");
    assert_eq!(store.entries()[0].id, id);
}

#[test]
fn slot_uses_camel_case_wire_names() {
    let repo = SqliteSlotRepository::try_new(open_db_in_memory().unwrap()).unwrap();
    let slot = EntrySlot::new(repo, "wire");
    let raw = r#"[{"id":"legacy-1","title":"Old","content":"c","type":"blog","tags":["x"],"createdAt":1,"updatedAt":2}]"#;
    slot.repository().write_slot("wire", raw).unwrap();

    let entries = slot.load().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id.as_str(), "legacy-1");
    assert_eq!(entries[0].kind, EntryType::Blog);

    slot.persist(&entries).unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&slot.repository().read_slot("wire").unwrap().unwrap()).unwrap();
    assert_eq!(written[0]["createdAt"], 1);
    assert_eq!(written[0]["updatedAt"], 2);
    assert_eq!(written[0]["type"], "blog");
}

#[test]
fn invalid_entries_are_reported_as_corrupt() {
    let repo = SqliteSlotRepository::try_new(open_db_in_memory().unwrap()).unwrap();
    let slot = EntrySlot::new(repo, "k");
    let cases = [
        r#"[{"id":"a","title":"","content":"","type":"note","tags":[],"createdAt":5,"updatedAt":4}]"#,
        r#"[{"id":"a","title":"","content":"","type":"note","tags":["x","x"],"createdAt":1,"updatedAt":1}]"#,
        r#"[{"id":"a","title":"","content":"","type":"poem","tags":[],"createdAt":1,"updatedAt":1}]"#,
    ];

    for raw in cases {
        slot.repository().write_slot("k", raw).unwrap();
        assert!(matches!(slot.load(), Err(LoadError::CorruptState(_))), "{raw}");
        assert_eq!(
            slot.repository().read_slot("k.corrupt").unwrap().as_deref(),
            Some(raw)
        );
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}
