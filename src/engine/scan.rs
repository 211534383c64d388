//! Incremental channel-history scanning.
//!
//! A [`ScanCoordinator`] walks a channel's history page by page (newest
//! first), skips messages already covered by the channel's [`RangeSet`],
//! fingerprints the images of uncovered messages, and produces a
//! [`ScanWalk`] that is committed atomically: fingerprints merged into the
//! guild's store and the walked ID span folded into the channel's coverage,
//! both under one guild lock.
//!
//! The walk is strictly sequential (page fetch, image fetch, hash, next
//! message); there is no parallelism within one run, so the first/last
//! observed IDs are well defined.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::engine::fingerprint::Fingerprint;
use crate::engine::ranges::{Range, RangeSet};
use crate::engine::store::FingerprintStore;
use crate::engine::{ChannelId, Location, MessageId};
use crate::imaging::{message_fingerprints, Fingerprinter, ImageFetcher};
use crate::platform::{ChatClient, PlatformError};

/// Messages walked between progress log lines.
const PROGRESS_EVERY: usize = 100;

/// Errors that abort a scan.
///
/// Per-image failures never abort; they are tallied in [`ScanStats`].
#[derive(Debug, Error)]
pub enum ScanError {
    /// History retrieval failed for the channel being scanned.
    #[error("failed to fetch history for channel {channel}: {source}")]
    History {
        /// The channel being walked.
        channel: ChannelId,
        /// The underlying platform failure.
        #[source]
        source: PlatformError,
    },
}

/// Parameters for one channel scan.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// Channel to walk.
    pub channel: ChannelId,
    /// Maximum number of messages to walk; `None` walks the full history.
    pub limit: Option<usize>,
    /// Walk only messages strictly older than this cursor.
    pub before: Option<MessageId>,
    /// Ignore existing coverage and rehash every message.
    pub force_rescan: bool,
    /// Cooperative cancel flag; checked between messages.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ScanRequest {
    /// Create a request walking the full history of `channel`.
    #[must_use]
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            ..Self::default()
        }
    }

    /// Cap the number of messages walked.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Start the walk strictly below the given message ID.
    #[must_use]
    pub fn with_before(mut self, before: MessageId) -> Self {
        self.before = Some(before);
        self
    }

    /// Rehash messages even when their IDs are already covered.
    #[must_use]
    pub fn with_force_rescan(mut self, force: bool) -> Self {
        self.force_rescan = force;
        self
    }

    /// Attach a cancel flag for cooperative termination.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Tallies from one scan run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Messages fingerprinted this run.
    pub scanned: usize,
    /// Messages skipped because their ID was already covered.
    pub skipped: usize,
    /// Distinct fingerprints accumulated this run.
    pub unique_fingerprints: usize,
    /// Images that failed to download or decode.
    pub image_errors: usize,
    /// Embeds that carried no usable image URL.
    pub unhashable: usize,
    /// Whether the walk was cancelled before completion.
    pub interrupted: bool,
}

impl ScanStats {
    /// Total messages walked, scanned or skipped.
    #[must_use]
    pub fn walked(&self) -> usize {
        self.scanned + self.skipped
    }
}

/// The outcome of a completed walk, ready to commit.
#[derive(Debug)]
pub struct ScanWalk {
    /// Channel that was walked.
    pub channel: ChannelId,
    /// Fingerprints accumulated this run, keyed to their locations.
    pub fingerprints: HashMap<Fingerprint, Vec<Location>>,
    /// Span of every message ID observed (scanned or skipped), if any.
    pub observed: Option<Range>,
    /// Run tallies.
    pub stats: ScanStats,
}

impl ScanWalk {
    /// Commit this walk into a guild's state: merge the fingerprints and
    /// fold the observed span into the channel's coverage.
    ///
    /// Call this while holding the guild's lock so the merge and the range
    /// insert land together. An interrupted walk commits nothing.
    ///
    /// Marking the full `[min, max]` numeric span covered is an
    /// approximation: snowflake IDs are sparse, so the span also claims IDs
    /// that were never issued or whose messages were deleted before the
    /// scan, and a limit-truncated walk can claim IDs between its last page
    /// and previously covered territory. That is the accepted trade-off for
    /// O(1) coverage bookkeeping per walk.
    pub fn commit(self, fingerprints: &mut FingerprintStore, coverage: &mut RangeSet) -> ScanStats {
        if self.stats.interrupted {
            log::warn!(
                "scan of channel {} was interrupted; discarding partial walk",
                self.channel
            );
            return self.stats;
        }
        let added = fingerprints.merge(self.fingerprints);
        if let Some(span) = self.observed {
            coverage.insert(span);
        }
        log::debug!(
            "committed scan of channel {}: {} locations added, coverage now {} ranges",
            self.channel,
            added,
            coverage.len()
        );
        self.stats
    }
}

/// Drives incremental scans over channel histories.
pub struct ScanCoordinator<'a> {
    client: &'a dyn ChatClient,
    fetcher: &'a dyn ImageFetcher,
    fingerprinter: &'a dyn Fingerprinter,
    page_size: usize,
}

impl<'a> ScanCoordinator<'a> {
    /// Create a coordinator over the given collaborators.
    #[must_use]
    pub fn new(
        client: &'a dyn ChatClient,
        fetcher: &'a dyn ImageFetcher,
        fingerprinter: &'a dyn Fingerprinter,
    ) -> Self {
        Self {
            client,
            fetcher,
            fingerprinter,
            page_size: PROGRESS_EVERY,
        }
    }

    /// Set the history page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Walk a channel's history against a coverage snapshot.
    ///
    /// `coverage` is the channel's [`RangeSet`] as of the start of the run;
    /// messages whose IDs it contains are counted as skipped (unless
    /// `force_rescan` is set) but still extend the observed span. The walk
    /// mutates nothing; commit the returned [`ScanWalk`] under the guild
    /// lock.
    pub fn scan_channel(
        &self,
        request: &ScanRequest,
        coverage: &RangeSet,
    ) -> Result<ScanWalk, ScanError> {
        log::info!(
            "scanning channel {}, {} messages",
            request.channel,
            request
                .limit
                .map_or_else(|| "all".to_string(), |n| n.to_string())
        );

        let mut stats = ScanStats::default();
        let mut fingerprints: HashMap<Fingerprint, Vec<Location>> = HashMap::new();
        let mut observed: Option<Range> = None;
        let mut cursor = request.before;
        let mut remaining = request.limit;

        'walk: loop {
            let page_limit = remaining.map_or(self.page_size, |r| r.min(self.page_size));
            if page_limit == 0 {
                break;
            }

            let page = self
                .client
                .history_page(request.channel, cursor, page_limit)
                .map_err(|source| ScanError::History {
                    channel: request.channel,
                    source,
                })?;
            if page.is_empty() {
                break;
            }

            for message in &page {
                if request.is_cancelled() {
                    stats.interrupted = true;
                    break 'walk;
                }

                if stats.walked() > 0 && stats.walked() % PROGRESS_EVERY == 0 {
                    log::info!(
                        "scanned {}/{} messages in channel {}",
                        stats.scanned,
                        stats.walked(),
                        request.channel
                    );
                }

                observed = Some(match observed {
                    Some(span) => Range::new(span.lo.min(message.id), span.hi.max(message.id)),
                    None => Range::new(message.id, message.id),
                });

                if !request.force_rescan && coverage.contains(message.id) {
                    stats.skipped += 1;
                    continue;
                }

                let images = message_fingerprints(message, self.fetcher, self.fingerprinter);
                for fingerprint in images.fingerprints {
                    let location = Location {
                        channel: request.channel,
                        message: message.id,
                    };
                    fingerprints.entry(fingerprint).or_default().push(location);
                }
                stats.image_errors += images.errors;
                stats.unhashable += images.unhashable;
                stats.scanned += 1;
            }

            cursor = page.last().map(|m| m.id);
            if let Some(r) = remaining {
                remaining = Some(r.saturating_sub(page.len()));
            }
        }

        stats.unique_fingerprints = fingerprints.len();
        log::info!(
            "walk of channel {} finished: {} scanned, {} skipped, {} unique fingerprints, {} errors{}",
            request.channel,
            stats.scanned,
            stats.skipped,
            stats.unique_fingerprints,
            stats.image_errors,
            if stats.interrupted { " (interrupted)" } else { "" }
        );

        Ok(ScanWalk {
            channel: request.channel,
            fingerprints,
            observed,
            stats,
        })
    }
}
