//! Owner command parsing.
//!
//! Commands arrive as plain chat text: the configured prefix word, a command
//! name, then arguments (`reposti scan 500 rescan #memes`). Each message is
//! parsed once into a typed [`Command`]; execution lives in [`handlers`].
//! The name-to-parser table below is the single registry of the command
//! surface.

pub mod handlers;

use thiserror::Error;

use crate::engine::{ChannelId, Fingerprint, FingerprintError, MessageId};

/// A command that failed to parse. Surfaced back to the owner as reply
/// text, never as a process error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// `diff` takes exactly two message IDs.
    #[error("This command needs 2 message IDs.")]
    DiffNeedsTwoIds,

    /// `hashdiff` takes exactly two fingerprints.
    #[error("This command needs 2 fingerprints.")]
    HashDiffNeedsTwoFingerprints,

    /// A fingerprint argument was not valid hex.
    #[error("That doesn't look like a fingerprint: {0}")]
    BadFingerprint(#[from] FingerprintError),

    /// The command word matched nothing in the table.
    #[error("Unknown command {0:?}.")]
    Unknown(String),
}

/// Which channels an `include`/`exclude` command targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelection {
    /// Every channel in the guild, resolved at execution time.
    All,
    /// No channels.
    None,
    /// The channels mentioned in the command message.
    Mentioned(Vec<ChannelId>),
}

/// Typed arguments for `scan`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanCommand {
    /// Maximum messages to walk per channel; `None` walks full history.
    pub limit: Option<usize>,
    /// Start below the invoking message instead of at the newest.
    pub before_invocation: bool,
    /// Scan every channel in the guild.
    pub all_channels: bool,
    /// Ignore existing coverage.
    pub rescan: bool,
    /// Explicitly mentioned channels; overrides `all_channels`.
    pub channels: Vec<ChannelId>,
}

/// Typed arguments for `clear`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearCommand {
    /// Drop coverage for every channel in the guild.
    pub all_channels: bool,
    /// Explicitly mentioned channels.
    pub channels: Vec<ChannelId>,
}

/// A fully parsed owner command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness greeting.
    Hello,
    /// Scan channel history into the fingerprint store.
    Scan(ScanCommand),
    /// Drop scan coverage for channels.
    Clear(ClearCommand),
    /// Fingerprint the replied-to message.
    Hash,
    /// Hamming distance between the images of two messages.
    Diff {
        /// First message ID.
        first: MessageId,
        /// Second message ID.
        second: MessageId,
    },
    /// Hamming distance between two literal fingerprints.
    HashDiff {
        /// First fingerprint.
        first: Fingerprint,
        /// Second fingerprint.
        second: Fingerprint,
    },
    /// Turn live repost checking on.
    Enable,
    /// Turn live repost checking off.
    Disable,
    /// Add channels to the repost-checked set.
    Include(ChannelSelection),
    /// Remove channels from the repost-checked set.
    Exclude(ChannelSelection),
}

type ParseFn = fn(&[&str], &[ChannelId]) -> Result<Command, CommandError>;

/// Command table: name to argument parser.
const COMMANDS: &[(&str, ParseFn)] = &[
    ("scan", parse_scan),
    ("clear", parse_clear),
    ("hash", parse_hash),
    ("diff", parse_diff),
    ("hashdiff", parse_hashdiff),
    ("enable", parse_enable),
    ("disable", parse_disable),
    ("include", parse_include),
    ("exclude", parse_exclude),
];

/// Parse message text against the command surface.
///
/// Returns `None` when the text is not addressed to the bot at all;
/// `Some(Err(..))` when it is but the arguments are malformed.
pub fn parse(
    prefix: &str,
    content: &str,
    mentions: &[ChannelId],
) -> Option<Result<Command, CommandError>> {
    let content = content.trim();

    if content == format!("hi {prefix}") {
        return Some(Ok(Command::Hello));
    }

    let rest = content.strip_prefix(prefix)?;
    // Require a word boundary so a prefix of "repo" doesn't match "reposti".
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let mut words = rest.split_whitespace();
    let name = words.next()?;
    let args: Vec<&str> = words.collect();

    for (command, parse_args) in COMMANDS {
        if *command == name {
            return Some(parse_args(&args, mentions));
        }
    }
    Some(Err(CommandError::Unknown(name.to_string())))
}

fn parse_scan(args: &[&str], mentions: &[ChannelId]) -> Result<Command, CommandError> {
    let mut scan = ScanCommand::default();
    for word in args {
        if let Ok(limit) = word.parse::<usize>() {
            scan.limit = Some(limit);
        } else {
            match *word {
                "now" => scan.before_invocation = true,
                "all" => scan.all_channels = true,
                "rescan" => scan.rescan = true,
                _ => {} // channel mentions arrive structured, not as text
            }
        }
    }
    scan.channels = mentions.to_vec();
    Ok(Command::Scan(scan))
}

fn parse_clear(args: &[&str], mentions: &[ChannelId]) -> Result<Command, CommandError> {
    Ok(Command::Clear(ClearCommand {
        all_channels: args.first() == Some(&"all"),
        channels: mentions.to_vec(),
    }))
}

fn parse_hash(_args: &[&str], _mentions: &[ChannelId]) -> Result<Command, CommandError> {
    Ok(Command::Hash)
}

fn parse_diff(args: &[&str], _mentions: &[ChannelId]) -> Result<Command, CommandError> {
    match args {
        [first, second] => {
            let first = first.parse().map_err(|_| CommandError::DiffNeedsTwoIds)?;
            let second = second.parse().map_err(|_| CommandError::DiffNeedsTwoIds)?;
            Ok(Command::Diff { first, second })
        }
        _ => Err(CommandError::DiffNeedsTwoIds),
    }
}

fn parse_hashdiff(args: &[&str], _mentions: &[ChannelId]) -> Result<Command, CommandError> {
    match args {
        [first, second] => Ok(Command::HashDiff {
            first: Fingerprint::from_hex(first)?,
            second: Fingerprint::from_hex(second)?,
        }),
        _ => Err(CommandError::HashDiffNeedsTwoFingerprints),
    }
}

fn parse_enable(_args: &[&str], _mentions: &[ChannelId]) -> Result<Command, CommandError> {
    Ok(Command::Enable)
}

fn parse_disable(_args: &[&str], _mentions: &[ChannelId]) -> Result<Command, CommandError> {
    Ok(Command::Disable)
}

fn parse_include(args: &[&str], mentions: &[ChannelId]) -> Result<Command, CommandError> {
    Ok(Command::Include(parse_selection(args, mentions)))
}

fn parse_exclude(args: &[&str], mentions: &[ChannelId]) -> Result<Command, CommandError> {
    Ok(Command::Exclude(parse_selection(args, mentions)))
}

fn parse_selection(args: &[&str], mentions: &[ChannelId]) -> ChannelSelection {
    match args.first() {
        Some(&"all") => ChannelSelection::All,
        Some(&"none") => ChannelSelection::None,
        _ => ChannelSelection::Mentioned(mentions.to_vec()),
    }
}
