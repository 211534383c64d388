//! In-memory collaborators for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use repostdupe::engine::{ChannelId, Fingerprint, GuildId, MessageId};
use repostdupe::imaging::{Fingerprinter, ImageFetcher, ImagingError};
use repostdupe::platform::{ChannelMessage, ChatClient, PlatformError};

/// A chat platform held entirely in memory.
///
/// Histories are stored newest-first per channel; everything sent through
/// `send` is recorded for assertions.
#[derive(Default)]
pub struct MemoryPlatform {
    histories: Mutex<HashMap<ChannelId, Vec<ChannelMessage>>>,
    channels: Mutex<HashMap<GuildId, Vec<ChannelId>>>,
    pub sent: Mutex<Vec<(ChannelId, String)>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a channel's history; messages are sorted newest-first here.
    pub fn seed_history(&self, channel: ChannelId, mut messages: Vec<ChannelMessage>) {
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        self.histories.lock().unwrap().insert(channel, messages);
    }

    pub fn seed_guild_channels(&self, guild: GuildId, channels: Vec<ChannelId>) {
        self.channels.lock().unwrap().insert(guild, channels);
    }

    pub fn sent_texts(&self, channel: ChannelId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

impl ChatClient for MemoryPlatform {
    fn history_page(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, PlatformError> {
        let histories = self.histories.lock().unwrap();
        let messages = histories
            .get(&channel)
            .ok_or(PlatformError::ChannelNotFound(channel))?;
        Ok(messages
            .iter()
            .filter(|m| before.is_none_or(|cursor| m.id < cursor))
            .take(limit)
            .cloned()
            .collect())
    }

    fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<ChannelMessage, PlatformError> {
        let histories = self.histories.lock().unwrap();
        histories
            .get(&channel)
            .and_then(|messages| messages.iter().find(|m| m.id == message))
            .cloned()
            .ok_or(PlatformError::MessageNotFound { channel, message })
    }

    fn guild_channels(&self, guild: GuildId) -> Result<Vec<ChannelId>, PlatformError> {
        Ok(self
            .channels
            .lock()
            .unwrap()
            .get(&guild)
            .cloned()
            .unwrap_or_default())
    }

    fn channel_name(&self, channel: ChannelId) -> String {
        format!("channel-{channel}")
    }

    fn send(&self, channel: ChannelId, text: &str) -> Result<(), PlatformError> {
        self.sent.lock().unwrap().push((channel, text.to_string()));
        Ok(())
    }
}

/// Serves image bytes straight out of a map.
#[derive(Default)]
pub struct ByteFetcher {
    images: HashMap<String, Vec<u8>>,
}

impl ByteFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: &str, bytes: &[u8]) -> Self {
        self.images.insert(url.to_string(), bytes.to_vec());
        self
    }
}

impl ImageFetcher for ByteFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImagingError> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| ImagingError::Fetch {
                url: url.to_string(),
                reason: "not seeded".to_string(),
            })
    }
}

/// Treats the fetched bytes as the fingerprint itself.
///
/// Bytes starting with `!` simulate an undecodable image.
pub struct IdentityFingerprinter;

impl Fingerprinter for IdentityFingerprinter {
    fn fingerprint(&self, bytes: &[u8]) -> Result<Fingerprint, ImagingError> {
        if bytes.first() == Some(&b'!') {
            return Err(ImagingError::Unreadable("marked unreadable".to_string()));
        }
        Ok(Fingerprint::from_bytes(bytes))
    }

    fn bit_len(&self) -> usize {
        32
    }
}

/// A message carrying one image URL.
pub fn image_message(channel: ChannelId, id: MessageId, url: &str) -> ChannelMessage {
    let mut message = ChannelMessage::new(id, channel, 999).with_image_urls(vec![url.to_string()]);
    message.link = format!("https://chat.example/{channel}/{id}");
    message
}

/// A plain text message with no images.
pub fn text_message(channel: ChannelId, id: MessageId, content: &str) -> ChannelMessage {
    ChannelMessage::new(id, channel, 999).with_content(content)
}
