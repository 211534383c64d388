//! Repost-detection engine.
//!
//! The engine is the part of the bot with real invariants:
//! - [`ranges`]: which spans of a channel's history have been scanned
//! - [`fingerprint`]: the perceptual-hash value type and Hamming distance
//! - [`store`]: fingerprint -> location mapping per guild
//! - [`matcher`]: the repost decision
//! - [`scan`]: the incremental history walk that feeds the store
//!
//! Everything platform-facing (history retrieval, image download, the hash
//! computation itself) is consumed through the collaborator traits in
//! [`crate::platform`] and [`crate::imaging`].

pub mod fingerprint;
pub mod matcher;
pub mod ranges;
pub mod scan;
pub mod store;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use fingerprint::{DistanceError, Fingerprint, FingerprintError};
pub use matcher::MatchEngine;
pub use ranges::{Range, RangeSet};
pub use scan::{ScanCoordinator, ScanError, ScanRequest, ScanStats, ScanWalk};
pub use store::FingerprintStore;

/// A guild (top-level community) snowflake ID.
pub type GuildId = u64;
/// A channel snowflake ID.
pub type ChannelId = u64;
/// A message snowflake ID. Monotonically increasing with creation time,
/// not contiguous.
pub type MessageId = u64;
/// A user snowflake ID.
pub type UserId = u64;

/// Where a fingerprint was seen: a `(channel, message)` pair, naturally
/// unique per real message.
///
/// Serialized as a `[channel, message]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(ChannelId, MessageId)", into = "(ChannelId, MessageId)")]
pub struct Location {
    /// Channel the message was posted in.
    pub channel: ChannelId,
    /// The message carrying the image.
    pub message: MessageId,
}

impl From<(ChannelId, MessageId)> for Location {
    fn from((channel, message): (ChannelId, MessageId)) -> Self {
        Self { channel, message }
    }
}

impl From<Location> for (ChannelId, MessageId) {
    fn from(loc: Location) -> Self {
        (loc.channel, loc.message)
    }
}
