//! Search/filter/sort pipeline over the in-memory entry collection.
//!
//! # Responsibility
//! - Derive the display-ordered, filtered view for a query string.
//! - Shape list items for display without touching the store.

pub mod view;
