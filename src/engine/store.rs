//! Per-guild fingerprint storage.
//!
//! Maps each fingerprint ever seen in a guild to the list of message
//! locations that produced it. Location lists preserve insertion order and
//! reject duplicates by value, so repeated merges of overlapping scan output
//! are idempotent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::fingerprint::Fingerprint;
use crate::engine::Location;

/// Mapping `fingerprint -> ordered set of locations`.
///
/// Serialized as a JSON object keyed by hex fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintStore {
    entries: HashMap<Fingerprint, Vec<Location>>,
}

impl FingerprintStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of scan output into the store.
    ///
    /// New fingerprints are inserted with their locations de-duplicated;
    /// existing fingerprints gain only the locations not already present.
    /// Calling this repeatedly with the same input leaves the store
    /// unchanged after the first call. Returns the number of locations
    /// actually added.
    pub fn merge(&mut self, batch: HashMap<Fingerprint, Vec<Location>>) -> usize {
        let mut added = 0;
        for (fingerprint, locations) in batch {
            let stored = self.entries.entry(fingerprint).or_default();
            for location in locations {
                if !stored.contains(&location) {
                    stored.push(location);
                    added += 1;
                }
            }
        }
        added
    }

    /// Exact-match lookup.
    #[must_use]
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&[Location]> {
        self.entries.get(fingerprint).map(Vec::as_slice)
    }

    /// Iterate over every stored `(fingerprint, locations)` pair.
    ///
    /// Ordering is hash-table order: unspecified, but stable across
    /// iterations as long as the store is not mutated. Threshold matching
    /// relies on that stability to resolve ties by first-encountered.
    pub fn entries(&self) -> impl Iterator<Item = (&Fingerprint, &[Location])> {
        self.entries.iter().map(|(fp, locs)| (fp, locs.as_slice()))
    }

    /// Number of distinct fingerprints stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no fingerprints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of stored locations across all fingerprints.
    #[must_use]
    pub fn location_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
