//! Per-guild state: the aggregate record and its guarded store.
//!
//! One [`GuildRecord`] exists per guild for the lifetime of the process. All
//! mutations go through [`GuildStore::update`], which holds that guild's
//! lock across load, mutation, and save: two scans finishing concurrently
//! cannot lose each other's commits, and live-message matching only ever
//! waits for one commit.

pub mod file;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{ChannelId, FingerprintStore, GuildId, RangeSet};
use crate::platform::GuildIdentity;

pub use file::FileBackend;

/// Errors from the persistence layer.
///
/// Corrupt persisted state is not an error: backends recover it internally
/// (backup, reset to empty) per the load contract.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A guild record could not be encoded for saving.
    #[error("failed to encode guild record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Storage key for a guild's record.
///
/// Derived from the guild's identity as the alphanumeric fragment of its
/// name plus its unique ID; the ID suffix makes the key injective even when
/// two guild names sanitize to the same fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuildKey(String);

impl GuildKey {
    /// Wrap an already-derived key, e.g. one listed by a backend.
    #[must_use]
    pub fn from_raw(raw: String) -> Self {
        Self(raw)
    }

    /// The key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&GuildIdentity> for GuildKey {
    fn from(identity: &GuildIdentity) -> Self {
        let fragment: String = identity
            .name
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        Self(format!("{}_{}", fragment, identity.id))
    }
}

impl std::fmt::Display for GuildKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything remembered about one guild.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildRecord {
    /// Every fingerprint seen in scanned history, with its locations.
    #[serde(default)]
    pub fingerprints: FingerprintStore,
    /// Scanned-ID coverage per channel.
    #[serde(default)]
    pub ranges: HashMap<ChannelId, RangeSet>,
    /// Whether live repost checking is on.
    #[serde(default)]
    pub enabled: bool,
    /// Channels checked for reposts. An empty set means "no channels";
    /// "all channels" is resolved to a concrete set at command time, never
    /// stored as a sentinel.
    #[serde(default)]
    pub included_channels: BTreeSet<ChannelId>,
}

/// Loads and saves guild records.
pub trait GuildBackend: Send + Sync {
    /// Load a guild's record, or an empty one if none was persisted yet.
    ///
    /// Implementations must recover corrupt state themselves: back the raw
    /// contents up next to the original, log, and return an empty record.
    fn load(&self, key: &GuildKey) -> Result<GuildRecord, StoreError>;

    /// Persist a guild's record.
    fn save(&self, key: &GuildKey, record: &GuildRecord) -> Result<(), StoreError>;

    /// List the keys of every persisted guild.
    fn list(&self) -> Result<Vec<GuildKey>, StoreError>;
}

struct GuildEntry {
    key: GuildKey,
    record: GuildRecord,
}

/// Guarded access to guild records over a pluggable backend.
pub struct GuildStore {
    backend: Box<dyn GuildBackend>,
    guilds: Mutex<HashMap<GuildId, Arc<Mutex<GuildEntry>>>>,
}

impl GuildStore {
    /// Create a store over the given backend.
    #[must_use]
    pub fn new(backend: Box<dyn GuildBackend>) -> Self {
        Self {
            backend,
            guilds: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, identity: &GuildIdentity) -> Result<Arc<Mutex<GuildEntry>>, StoreError> {
        let mut guilds = self.guilds.lock().unwrap();
        if let Some(entry) = guilds.get(&identity.id) {
            return Ok(Arc::clone(entry));
        }
        let key = GuildKey::from(identity);
        let record = self.backend.load(&key)?;
        let entry = Arc::new(Mutex::new(GuildEntry { key, record }));
        guilds.insert(identity.id, Arc::clone(&entry));
        Ok(entry)
    }

    /// Read a guild's record under its lock.
    pub fn read<R>(
        &self,
        identity: &GuildIdentity,
        f: impl FnOnce(&GuildRecord) -> R,
    ) -> Result<R, StoreError> {
        let entry = self.entry(identity)?;
        let entry = entry.lock().unwrap();
        Ok(f(&entry.record))
    }

    /// Mutate a guild's record and persist it, all under its lock.
    ///
    /// The save happens before the lock is released, so a concurrent
    /// `update` can never observe (or overwrite with) unsaved state.
    pub fn update<R>(
        &self,
        identity: &GuildIdentity,
        f: impl FnOnce(&mut GuildRecord) -> R,
    ) -> Result<R, StoreError> {
        let entry = self.entry(identity)?;
        let mut entry = entry.lock().unwrap();
        let out = f(&mut entry.record);
        self.backend.save(&entry.key, &entry.record)?;
        Ok(out)
    }
}
