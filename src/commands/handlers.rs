//! Command execution.
//!
//! Handlers turn a parsed [`Command`] into guild-state mutations and reply
//! text. Soft failures (bad IDs, missing messages, unhashable images) become
//! replies; only persistence and platform send failures propagate.

use std::collections::BTreeSet;

use crate::bot::{BotError, RepostBot};
use crate::commands::{ChannelSelection, ClearCommand, Command, ScanCommand};
use crate::engine::{ChannelId, Fingerprint, MessageId, ScanCoordinator, ScanRequest};
use crate::imaging::message_fingerprints;
use crate::platform::{ChannelMessage, GuildIdentity, MessageReference};

/// Execute a parsed command, sending its replies through the platform.
pub(crate) fn execute(
    bot: &RepostBot,
    guild: &GuildIdentity,
    message: &ChannelMessage,
    command: Command,
) -> Result<(), BotError> {
    match command {
        Command::Hello => reply(bot, message, "Hello there"),
        Command::Scan(scan) => run_scan(bot, guild, message, &scan),
        Command::Clear(clear) => run_clear(bot, guild, message, &clear),
        Command::Hash => run_hash(bot, message),
        Command::Diff { first, second } => run_diff(bot, message, first, second),
        Command::HashDiff { first, second } => run_hashdiff(bot, message, &first, &second),
        Command::Enable => run_enable(bot, guild, message),
        Command::Disable => run_disable(bot, guild, message),
        Command::Include(selection) => run_include(bot, guild, message, &selection),
        Command::Exclude(selection) => run_exclude(bot, guild, message, &selection),
    }
}

fn reply(bot: &RepostBot, message: &ChannelMessage, text: &str) -> Result<(), BotError> {
    bot.client.send(message.channel, text)?;
    Ok(())
}

/// Mentioned channels win; `all` expands to the guild's channel list;
/// otherwise the command's own channel is the target.
fn resolve_channels(
    bot: &RepostBot,
    guild: &GuildIdentity,
    mentioned: &[ChannelId],
    all: bool,
    fallback: ChannelId,
) -> Result<Vec<ChannelId>, BotError> {
    if !mentioned.is_empty() {
        Ok(mentioned.to_vec())
    } else if all {
        Ok(bot.client.guild_channels(guild.id)?)
    } else {
        Ok(vec![fallback])
    }
}

fn channel_list(bot: &RepostBot, channels: impl IntoIterator<Item = ChannelId>) -> String {
    channels
        .into_iter()
        .map(|c| format!("#{}", bot.client.channel_name(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn run_scan(
    bot: &RepostBot,
    guild: &GuildIdentity,
    message: &ChannelMessage,
    scan: &ScanCommand,
) -> Result<(), BotError> {
    let channels = resolve_channels(bot, guild, &scan.channels, scan.all_channels, message.channel)?;
    reply(bot, message, "Scanning posts...")?;

    let coordinator = ScanCoordinator::new(&*bot.client, &*bot.fetcher, &*bot.fingerprinter)
        .with_page_size(bot.config.page_size);

    for channel in channels {
        let coverage = bot
            .store
            .read(guild, |record| {
                record.ranges.get(&channel).cloned().unwrap_or_default()
            })?;

        let mut request = ScanRequest::new(channel).with_force_rescan(scan.rescan);
        if let Some(limit) = scan.limit {
            request = request.with_limit(limit);
        }
        if scan.before_invocation {
            request = request.with_before(message.id);
        }
        if let Some(flag) = &bot.cancel {
            request = request.with_cancel_flag(flag.clone());
        }

        let name = bot.client.channel_name(channel);
        let walk = match coordinator.scan_channel(&request, &coverage) {
            Ok(walk) => walk,
            Err(e) => {
                log::error!("scan of #{name} failed: {e}");
                reply(bot, message, &format!("Failed to scan #{name}: {e}"))?;
                continue;
            }
        };

        if walk.stats.interrupted {
            reply(
                bot,
                message,
                &format!("Scan of #{name} was interrupted; nothing was recorded."),
            )?;
            continue;
        }

        // Commit fingerprints and coverage together, under the guild lock.
        let stats = bot.store.update(guild, |record| {
            let coverage = record.ranges.entry(channel).or_default();
            walk.commit(&mut record.fingerprints, coverage)
        })?;

        let info = format!(
            "Done. Scanned {}/{} posts in #{name}, found {} unique images, {} errors.",
            stats.scanned,
            stats.walked(),
            stats.unique_fingerprints,
            stats.image_errors
        );
        log::info!("{info}");
        reply(bot, message, &info)?;
    }
    Ok(())
}

fn run_clear(
    bot: &RepostBot,
    guild: &GuildIdentity,
    message: &ChannelMessage,
    clear: &ClearCommand,
) -> Result<(), BotError> {
    let channels = resolve_channels(bot, guild, &clear.channels, clear.all_channels, message.channel)?;

    bot.store.update(guild, |record| {
        for channel in &channels {
            record.ranges.remove(channel);
        }
    })?;

    let text = format!(
        "Removed scan cache for: {}",
        channel_list(bot, channels.iter().copied())
    );
    reply(bot, message, &text)
}

fn run_hash(bot: &RepostBot, message: &ChannelMessage) -> Result<(), BotError> {
    let text = match &message.reference {
        None => "Reply to a message to trigger this command.".to_string(),
        Some(MessageReference::Deleted) => "The message was deleted.".to_string(),
        Some(MessageReference::Inaccessible) => {
            "The platform refused to find the message this one references.".to_string()
        }
        Some(MessageReference::Message(referenced)) => {
            let images = message_fingerprints(referenced, &*bot.fetcher, &*bot.fingerprinter);
            let hex: Vec<&str> = images.fingerprints.iter().map(Fingerprint::as_hex).collect();
            format!(
                "Fingerprints: [{}], errors: {}, unhashable embeds: {}",
                hex.join(", "),
                images.errors,
                images.unhashable
            )
        }
    };
    reply(bot, message, &text)
}

fn run_diff(
    bot: &RepostBot,
    message: &ChannelMessage,
    first: MessageId,
    second: MessageId,
) -> Result<(), BotError> {
    let fetched = bot
        .client
        .fetch_message(message.channel, first)
        .and_then(|a| Ok((a, bot.client.fetch_message(message.channel, second)?)));
    let (first, second) = match fetched {
        Ok(pair) => pair,
        Err(e) => {
            log::debug!("diff lookup failed: {e}");
            return reply(bot, message, "An error occurred. Are the message IDs valid?");
        }
    };

    let first = message_fingerprints(&first, &*bot.fetcher, &*bot.fingerprinter);
    let second = message_fingerprints(&second, &*bot.fetcher, &*bot.fingerprinter);

    let text = match (first.fingerprints.first(), second.fingerprints.first()) {
        (None, _) => "1st message had no hashable images.".to_string(),
        (_, None) => "2nd message had no hashable images.".to_string(),
        (Some(a), Some(b)) => match a.distance(b) {
            Ok(distance) => distance.to_string(),
            Err(e) => e.to_string(),
        },
    };
    reply(bot, message, &text)
}

fn run_hashdiff(
    bot: &RepostBot,
    message: &ChannelMessage,
    first: &Fingerprint,
    second: &Fingerprint,
) -> Result<(), BotError> {
    let text = match first.distance(second) {
        Ok(distance) => distance.to_string(),
        Err(e) => e.to_string(),
    };
    reply(bot, message, &text)
}

fn run_enable(
    bot: &RepostBot,
    guild: &GuildIdentity,
    message: &ChannelMessage,
) -> Result<(), BotError> {
    bot.store.update(guild, |record| record.enabled = true)?;
    let text = format!(
        "Enabled repost checking on this server. Note that some channels may still be \
         excluded. Run `{} include all` to include all channels.",
        bot.config.command_prefix
    );
    reply(bot, message, &text)
}

fn run_disable(
    bot: &RepostBot,
    guild: &GuildIdentity,
    message: &ChannelMessage,
) -> Result<(), BotError> {
    bot.store.update(guild, |record| record.enabled = false)?;
    reply(bot, message, "Disabled repost checking on this server.")
}

fn run_include(
    bot: &RepostBot,
    guild: &GuildIdentity,
    message: &ChannelMessage,
    selection: &ChannelSelection,
) -> Result<(), BotError> {
    let updated: BTreeSet<ChannelId> = match selection {
        // "all" is resolved to today's concrete channel list, not stored
        // as a sentinel.
        ChannelSelection::All => bot.client.guild_channels(guild.id)?.into_iter().collect(),
        ChannelSelection::None => BTreeSet::new(),
        ChannelSelection::Mentioned(mentioned) => {
            let mut set = bot
                .store
                .read(guild, |record| record.included_channels.clone())?;
            set.extend(mentioned.iter().copied());
            set
        }
    };

    bot.store
        .update(guild, |record| record.included_channels = updated.clone())?;
    reply(bot, message, &included_summary(bot, &updated))
}

fn run_exclude(
    bot: &RepostBot,
    guild: &GuildIdentity,
    message: &ChannelMessage,
    selection: &ChannelSelection,
) -> Result<(), BotError> {
    let updated: BTreeSet<ChannelId> = match selection {
        ChannelSelection::All => BTreeSet::new(),
        ChannelSelection::None => bot.client.guild_channels(guild.id)?.into_iter().collect(),
        ChannelSelection::Mentioned(mentioned) => {
            let mut set = bot
                .store
                .read(guild, |record| record.included_channels.clone())?;
            if mentioned.iter().any(|c| !set.contains(c)) {
                return reply(
                    bot,
                    message,
                    "A mentioned channel was not in the list. List not updated.",
                );
            }
            for channel in mentioned {
                set.remove(channel);
            }
            set
        }
    };

    bot.store
        .update(guild, |record| record.included_channels = updated.clone())?;
    reply(bot, message, &included_summary(bot, &updated))
}

fn included_summary(bot: &RepostBot, channels: &BTreeSet<ChannelId>) -> String {
    if channels.is_empty() {
        "Not checking any channels for reposts.".to_string()
    } else {
        format!(
            "Checking the following channels for reposts: {}",
            channel_list(bot, channels.iter().copied())
        )
    }
}
