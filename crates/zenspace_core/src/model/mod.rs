//! Domain model for note/blog entries.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Enforce record-level invariants at construction and decode time.
//!
//! # Invariants
//! - Every entry is identified by a stable `EntryId`.
//! - Tag uniqueness is enforced by `TagSet`, not by callers.

pub mod entry;
pub mod tags;
