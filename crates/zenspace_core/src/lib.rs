//! Core domain logic for ZenSpace.
//! This crate is the single source of truth for entry invariants.

pub mod ai;
pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use ai::client::{AugmentationClient, AugmentationError, TitleSuggestion};
pub use ai::gemini::GeminiProvider;
pub use ai::provider::{GenerationRequest, GenerationResponse, ProviderError, TextProvider};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AiConfig, AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entry::{Entry, EntryId, EntryPatch, EntryType, EntryValidationError};
pub use model::tags::TagSet;
pub use repo::entry_slot::{EntrySlot, LoadError};
pub use repo::slot_repo::{
    MemorySlotRepository, RepoError, RepoResult, SlotRepository, SqliteSlotRepository,
};
pub use search::view::{entry_cards, entry_view, EntryCard};
pub use service::augment_service::{AnswerOutcome, AugmentOutcome, AugmentService, AugmentState};
pub use service::entry_store::{
    Confirmation, EntryStore, LoadState, MergeOutcome, StoreError, StoreResult,
};
pub use service::preview::{DocumentStats, MarkupRenderer, PlainTextRenderer};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
