//! The bot: command dispatch and live repost checking.
//!
//! An embedding process connects a concrete chat platform, constructs a
//! [`RepostBot`], and feeds every incoming message to
//! [`RepostBot::handle_message`]. Commands are honored only from the guild
//! owner; every other message runs through the live repost check when the
//! guild has checking enabled and the channel is included.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use thiserror::Error;

use crate::commands::{self, handlers};
use crate::config::Config;
use crate::engine::{MatchEngine, UserId};
use crate::guilds::{GuildStore, StoreError};
use crate::imaging::{message_fingerprints, Fingerprinter, ImageFetcher};
use crate::platform::{ChannelMessage, ChatClient, GuildIdentity, PlatformError};

/// Errors that escape the bot to the embedding process.
///
/// Per-image and per-message problems are handled internally (tallied or
/// turned into reply text); what remains is persistence and platform
/// failures, which have no in-process supervisor and are fatal to the
/// embedder.
#[derive(Debug, Error)]
pub enum BotError {
    /// Guild state could not be loaded or saved.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The platform rejected a send or lookup the bot cannot work around.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// The repost-detection bot.
pub struct RepostBot {
    pub(crate) config: Config,
    pub(crate) store: GuildStore,
    pub(crate) client: Arc<dyn ChatClient>,
    pub(crate) fetcher: Arc<dyn ImageFetcher>,
    pub(crate) fingerprinter: Arc<dyn Fingerprinter>,
    pub(crate) matcher: MatchEngine,
    pub(crate) cancel: Option<Arc<AtomicBool>>,
    user_id: UserId,
}

impl RepostBot {
    /// Assemble a bot over its collaborators.
    ///
    /// `user_id` is the bot's own platform user; its messages are ignored.
    #[must_use]
    pub fn new(
        config: Config,
        store: GuildStore,
        client: Arc<dyn ChatClient>,
        fetcher: Arc<dyn ImageFetcher>,
        fingerprinter: Arc<dyn Fingerprinter>,
        user_id: UserId,
    ) -> Self {
        let matcher = MatchEngine::new(config.match_threshold);
        Self {
            config,
            store,
            client,
            fetcher,
            fingerprinter,
            matcher,
            cancel: None,
            user_id,
        }
    }

    /// Attach a cancel flag propagated into every scan this bot starts.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The bot's configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process one incoming message: owner commands first, then the live
    /// repost check.
    pub fn handle_message(
        &self,
        guild: &GuildIdentity,
        message: &ChannelMessage,
    ) -> Result<(), BotError> {
        if message.author == self.user_id {
            return Ok(());
        }

        if message.author == guild.owner {
            match commands::parse(
                &self.config.command_prefix,
                &message.content,
                &message.channel_mentions,
            ) {
                Some(Ok(command)) => {
                    log::debug!("guild {}: owner command {command:?}", guild.id);
                    return handlers::execute(self, guild, message, command);
                }
                Some(Err(e)) => {
                    self.client.send(message.channel, &e.to_string())?;
                    return Ok(());
                }
                None => {}
            }
        }

        self.check_repost(guild, message)
    }

    /// Match a live message's images against the guild's stored
    /// fingerprints and announce the first hit.
    ///
    /// Live messages are matched only, never inserted; scanned history
    /// stays the authoritative source of fingerprints.
    fn check_repost(
        &self,
        guild: &GuildIdentity,
        message: &ChannelMessage,
    ) -> Result<(), BotError> {
        let eligible = self.store.read(guild, |record| {
            record.enabled && record.included_channels.contains(&message.channel)
        })?;
        if !eligible {
            return Ok(());
        }

        if message.image_urls.is_empty() {
            return Ok(());
        }
        let images = message_fingerprints(message, &*self.fetcher, &*self.fingerprinter);
        if images.fingerprints.is_empty() {
            return Ok(());
        }

        let matched = self.store.read(guild, |record| {
            self.matcher
                .find_repost(&record.fingerprints, &images.fingerprints)
                .map(|hit| hit.map(<[_]>::to_vec))
        })?;

        let locations = match matched {
            Ok(Some(locations)) => locations,
            Ok(None) => return Ok(()),
            Err(e) => {
                // Stored fingerprints disagree with the current hash size;
                // matching is impossible until history is rescanned.
                log::error!("guild {}: {e}", guild.id);
                return Ok(());
            }
        };

        // Point at the first recorded sighting; a dead link degrades to a
        // bare notice.
        let link = locations.first().and_then(|first| {
            match self.client.fetch_message(first.channel, first.message) {
                Ok(original) => Some(original.link),
                Err(e) => {
                    log::debug!("original message for repost notice is gone: {e}");
                    None
                }
            }
        });

        let reply = match link {
            Some(link) => format!("{} {link}", self.config.repost_notice),
            None => self.config.repost_notice.clone(),
        };
        self.client.send(message.channel, &reply)?;
        Ok(())
    }
}
