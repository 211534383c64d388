//! The chat-platform seam.
//!
//! The engine never talks to a chat platform directly; it consumes the
//! [`ChatClient`] trait, which covers exactly what the bot needs: paged
//! history retrieval, fetching a single message, listing a guild's channels,
//! and sending text. An embedding process implements this trait against a
//! concrete platform and pumps incoming messages into
//! [`crate::bot::RepostBot::handle_message`].

use thiserror::Error;

use crate::engine::{ChannelId, GuildId, MessageId, UserId};

/// Errors surfaced by a platform client.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// A message ID did not resolve in the given channel.
    #[error("message {message} not found in channel {channel}")]
    MessageNotFound {
        /// Channel that was searched.
        channel: ChannelId,
        /// The missing message ID.
        message: MessageId,
    },

    /// A channel ID did not resolve.
    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),

    /// Any other request failure (transport, permissions, rate limits).
    #[error("platform request failed: {0}")]
    Request(String),
}

/// A guild's identity as handed over by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildIdentity {
    /// Unique guild ID.
    pub id: GuildId,
    /// Display name; may contain arbitrary unicode.
    pub name: String,
    /// The guild owner, the only user allowed to issue commands.
    pub owner: UserId,
}

/// What a replied-to message resolved to.
#[derive(Debug, Clone)]
pub enum MessageReference {
    /// The referenced message has been deleted.
    Deleted,
    /// The platform declined to resolve the reference.
    Inaccessible,
    /// The referenced message, resolved.
    Message(Box<ChannelMessage>),
}

/// A message as seen through the platform seam.
///
/// The platform adapter is responsible for distilling attachments and embeds
/// into candidate image URLs (`image_urls`) and counting embeds that carry
/// no usable image (`opaque_embeds`).
#[derive(Debug, Clone, Default)]
pub struct ChannelMessage {
    /// Message snowflake ID.
    pub id: MessageId,
    /// Channel the message was posted in.
    pub channel: ChannelId,
    /// Author's user ID.
    pub author: UserId,
    /// Raw text content.
    pub content: String,
    /// Candidate image URLs from attachments and embeds.
    pub image_urls: Vec<String>,
    /// Embeds with no usable image URL.
    pub opaque_embeds: usize,
    /// Permalink to this message, used in repost replies.
    pub link: String,
    /// Channels mentioned in the content, in order of appearance.
    pub channel_mentions: Vec<ChannelId>,
    /// The message this one replies to, if any.
    pub reference: Option<MessageReference>,
}

impl ChannelMessage {
    /// Create a bare message.
    #[must_use]
    pub fn new(id: MessageId, channel: ChannelId, author: UserId) -> Self {
        Self {
            id,
            channel,
            author,
            ..Self::default()
        }
    }

    /// Set the text content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the candidate image URLs.
    #[must_use]
    pub fn with_image_urls(mut self, urls: Vec<String>) -> Self {
        self.image_urls = urls;
        self
    }

    /// Set the mentioned channels.
    #[must_use]
    pub fn with_channel_mentions(mut self, mentions: Vec<ChannelId>) -> Self {
        self.channel_mentions = mentions;
        self
    }

    /// Set the replied-to reference.
    #[must_use]
    pub fn with_reference(mut self, reference: MessageReference) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// Narrow client interface onto the chat platform.
///
/// Implementations must be usable from multiple threads; the bot may run
/// scans and live matching concurrently.
pub trait ChatClient: Send + Sync {
    /// Fetch one page of channel history, newest first, strictly older than
    /// `before` when a cursor is given. Returns at most `limit` messages;
    /// an empty page means the history is exhausted.
    fn history_page(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, PlatformError>;

    /// Fetch a single message by ID.
    fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<ChannelMessage, PlatformError>;

    /// List all channels of a guild.
    fn guild_channels(&self, guild: GuildId) -> Result<Vec<ChannelId>, PlatformError>;

    /// Human-readable channel name for reply texts.
    fn channel_name(&self, channel: ChannelId) -> String;

    /// Send a text message into a channel.
    fn send(&self, channel: ChannelId, text: &str) -> Result<(), PlatformError>;
}
