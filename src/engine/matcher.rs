//! Repost decision for incoming fingerprints.

use crate::engine::fingerprint::{DistanceError, Fingerprint};
use crate::engine::store::FingerprintStore;
use crate::engine::Location;

/// Decides whether a set of candidate fingerprints matches anything stored.
#[derive(Debug, Clone, Copy)]
pub struct MatchEngine {
    threshold: u32,
}

impl MatchEngine {
    /// Create a match engine.
    ///
    /// With `threshold == 0` only exact fingerprint matches count; with a
    /// positive threshold, any stored fingerprint at Hamming distance
    /// strictly below it counts.
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// The configured distance threshold.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Find the stored locations matching any of `candidates`.
    ///
    /// Candidates are checked in order and the first one yielding a match
    /// short-circuits the rest. At a positive threshold this is a brute-force
    /// scan over every stored fingerprint that returns the *first* entry
    /// under the threshold in store iteration order, not necessarily the
    /// closest. That non-minimality is long-standing observable behavior;
    /// callers depend on it, so it is kept.
    ///
    /// Fails with [`DistanceError::SizeMismatch`] when a candidate and a
    /// stored fingerprint have different bit lengths.
    pub fn find_repost<'s>(
        &self,
        store: &'s FingerprintStore,
        candidates: &[Fingerprint],
    ) -> Result<Option<&'s [Location]>, DistanceError> {
        for candidate in candidates {
            if self.threshold == 0 {
                if let Some(locations) = store.lookup(candidate) {
                    log::debug!("exact fingerprint match for {candidate}");
                    return Ok(Some(locations));
                }
            } else {
                for (stored, locations) in store.entries() {
                    let distance = candidate.distance(stored)?;
                    if distance < self.threshold {
                        log::debug!(
                            "fingerprint {candidate} within {distance} of stored {stored}"
                        );
                        return Ok(Some(locations));
                    }
                }
            }
        }
        Ok(None)
    }
}
