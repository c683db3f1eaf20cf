//! Use-case services over the entry collection.
//!
//! # Responsibility
//! - `entry_store`: the authoritative in-memory collection and its durable
//!   write-through.
//! - `augment_service`: AI augmentation orchestration.
//! - `preview`: read-only markup projections.

pub mod augment_service;
pub mod entry_store;
pub mod preview;
