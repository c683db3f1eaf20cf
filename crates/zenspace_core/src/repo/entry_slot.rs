//! Entry collection persistence contract over one durable slot.
//!
//! # Responsibility
//! - Serialize the full entry collection as one JSON array.
//! - Load and validate the collection, classifying failures.
//!
//! # Invariants
//! - `load(persist(x)) == x` for every valid collection, including empty.
//! - Ids are unique within a loaded collection.
//! - A corrupt slot value is copied to `<key>.corrupt` before it is reported.

use crate::model::entry::Entry;
use crate::repo::slot_repo::{RepoError, RepoResult, SlotRepository};
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Default slot key holding the serialized collection.
pub const DEFAULT_SLOT_KEY: &str = "zenspace_data_v1";

const CORRUPT_BACKUP_SUFFIX: &str = ".corrupt";

/// Classified failure of [`EntrySlot::load`].
#[derive(Debug)]
pub enum LoadError {
    /// The slot key has never been written.
    NotFound,
    /// The slot value cannot be parsed or violates entry invariants.
    CorruptState(String),
    /// The underlying storage failed.
    Repo(RepoError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "entry slot is empty"),
            Self::CorruptState(reason) => write!(f, "entry slot is corrupt: {reason}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::NotFound | Self::CorruptState(_) => None,
        }
    }
}

impl From<RepoError> for LoadError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// A slot repository bound to the key that holds the entry collection.
pub struct EntrySlot<R: SlotRepository> {
    repo: R,
    key: String,
}

impl<R: SlotRepository> EntrySlot<R> {
    pub fn new(repo: R, key: impl Into<String>) -> Self {
        Self {
            repo,
            key: key.into(),
        }
    }

    /// Binds `repo` to [`DEFAULT_SLOT_KEY`].
    pub fn with_default_key(repo: R) -> Self {
        Self::new(repo, DEFAULT_SLOT_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key under which an unreadable value is preserved.
    pub fn backup_key(&self) -> String {
        format!("{}{CORRUPT_BACKUP_SUFFIX}", self.key)
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Reconstructs the collection from the slot.
    ///
    /// # Errors
    /// - `NotFound` when the key is missing.
    /// - `CorruptState` when the value is not a valid entry array; the raw
    ///   value has been copied to [`Self::backup_key`] by then.
    /// - `Repo` when storage itself fails, including a failed backup write
    ///   of a corrupt value.
    pub fn load(&self) -> Result<Vec<Entry>, LoadError> {
        let started_at = Instant::now();
        let Some(raw) = self.repo.read_slot(&self.key)? else {
            info!("event=slot_load module=repo status=not_found");
            return Err(LoadError::NotFound);
        };

        match decode_collection(&raw) {
            Ok(entries) => {
                info!(
                    "event=slot_load module=repo status=ok entries={} bytes={} duration_ms={}",
                    entries.len(),
                    raw.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(entries)
            }
            Err(reason) => {
                warn!(
                    "event=slot_load module=repo status=corrupt bytes={} reason={}",
                    raw.len(),
                    reason
                );
                if let Err(err) = self.repo.write_slot(&self.backup_key(), &raw) {
                    error!(
                        "event=slot_backup module=repo status=error error_code=backup_write_failed error={}",
                        err
                    );
                    // Without a backup the slot value is the only copy.
                    return Err(LoadError::Repo(err));
                }
                Err(LoadError::CorruptState(reason))
            }
        }
    }

    /// Serializes and writes the whole collection.
    pub fn persist(&self, entries: &[Entry]) -> RepoResult<()> {
        let started_at = Instant::now();
        let payload = encode_collection(entries)?;
        match self.repo.write_slot(&self.key, &payload) {
            Ok(()) => {
                info!(
                    "event=slot_persist module=repo status=ok entries={} bytes={} duration_ms={}",
                    entries.len(),
                    payload.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=slot_persist module=repo status=error entries={} error_code=slot_write_failed error={}",
                    entries.len(),
                    err
                );
                Err(err)
            }
        }
    }
}

/// Encodes a collection into the slot wire format.
pub fn encode_collection(entries: &[Entry]) -> RepoResult<String> {
    serde_json::to_string(entries)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode entries: {err}")))
}

/// Decodes and validates the slot wire format.
///
/// Returns a human-readable reason on failure.
pub fn decode_collection(raw: &str) -> Result<Vec<Entry>, String> {
    let entries: Vec<Entry> = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in &entries {
        if !seen.insert(entry.id.as_str()) {
            return Err(format!("duplicate entry id `{}`", entry.id));
        }
    }
    Ok(entries)
}
