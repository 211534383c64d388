//! Flat-file JSON backend for guild records.
//!
//! One file per guild under a data directory, wrapped in an envelope with a
//! SHA-256 checksum over the serialized record. A file that fails to parse
//! or whose checksum does not match is backed up verbatim to a `.bak`
//! sibling and replaced with an empty record on the next save; corrupt
//! state is never silently discarded, and never aborts startup.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::guilds::{GuildBackend, GuildKey, GuildRecord, StoreError};

/// Envelope for guild files to include integrity checks.
#[derive(Debug, Serialize, Deserialize)]
struct RecordEnvelope {
    /// SHA256 checksum of the compact-serialized record.
    checksum: String,
    /// When the record was last saved.
    updated_at: DateTime<Utc>,
    /// The actual guild record.
    record: GuildRecord,
}

/// Guild records as JSON files in a directory.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (and create if needed) a backend rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// The backing directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &GuildKey) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn checksum(record: &GuildRecord) -> Result<String, serde_json::Error> {
        // MUST hash the same compact serialization on save and load.
        let compact = serde_json::to_string(record)?;
        let mut hasher = Sha256::new();
        hasher.update(compact.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Back up unreadable contents verbatim so nothing is lost, then let the
    /// caller proceed with an empty record.
    fn quarantine(&self, path: &Path, contents: &str, reason: &str) -> Result<(), StoreError> {
        let backup = path.with_extension("json.bak");
        log::warn!(
            "guild record {} is unreadable ({reason}); backing up to {} and starting empty",
            path.display(),
            backup.display()
        );
        fs::write(&backup, contents).map_err(|source| StoreError::Io {
            path: backup,
            source,
        })
    }
}

impl GuildBackend for FileBackend {
    fn load(&self, key: &GuildKey) -> Result<GuildRecord, StoreError> {
        let path = self.record_path(key);
        if !path.exists() {
            log::debug!("no record for guild {key}, starting empty");
            return Ok(GuildRecord::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        let envelope: RecordEnvelope = match serde_json::from_str(&contents) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.quarantine(&path, &contents, &e.to_string())?;
                return Ok(GuildRecord::default());
            }
        };

        let expected = Self::checksum(&envelope.record).map_err(StoreError::Encode)?;
        if expected != envelope.checksum {
            self.quarantine(&path, &contents, "checksum mismatch")?;
            return Ok(GuildRecord::default());
        }

        Ok(envelope.record)
    }

    fn save(&self, key: &GuildKey, record: &GuildRecord) -> Result<(), StoreError> {
        let envelope = RecordEnvelope {
            checksum: Self::checksum(record).map_err(StoreError::Encode)?,
            updated_at: Utc::now(),
            record: record.clone(),
        };
        let json = serde_json::to_string_pretty(&envelope).map_err(StoreError::Encode)?;

        let path = self.record_path(key);
        fs::write(&path, json).map_err(|source| StoreError::Io { path, source })
    }

    fn list(&self) -> Result<Vec<GuildKey>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(GuildKey::from_raw(stem.to_string()));
                }
            }
        }
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(keys)
    }
}
