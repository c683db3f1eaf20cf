//! Durable slot persistence.
//!
//! # Responsibility
//! - Define the key/value slot contract used by the entry store.
//! - Isolate SQLite details from service orchestration.
//! - Own the serialized collection format and its load-time validation.
//!
//! # Invariants
//! - A slot value is always written whole; there are no partial updates.
//! - Unreadable slot content is reported as `CorruptState`, never as a panic.

pub mod entry_slot;
pub mod slot_repo;
