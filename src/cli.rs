//! Command-line interface definitions for the repostdupe maintenance tool.
//!
//! The binary does not speak to any chat platform; it operates on the same
//! fingerprints and guild records the bot library does. Useful for checking
//! what an image hashes to, comparing fingerprints by hand, and inspecting
//! persisted guild state.
//!
//! # Example
//!
//! ```bash
//! # Fingerprint a local image
//! repostdupe hash meme.png
//!
//! # Hamming distance between two stored fingerprints
//! repostdupe hashdiff 00ff3c81... 00ff3d81...
//!
//! # Summarize every persisted guild record
//! repostdupe stats --data-dir ./data
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Near-duplicate image repost detector: maintenance tool.
///
/// Inspects and exercises the fingerprinting engine and the persisted
/// guild records used by the bot.
#[derive(Debug, Parser)]
#[command(name = "repostdupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for repostdupe.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute the perceptual fingerprint of a local image file
    Hash(HashArgs),
    /// Hamming distance between two hex fingerprints
    Hashdiff(HashdiffArgs),
    /// Summarize persisted guild records
    Stats(StatsArgs),
}

/// Arguments for the hash subcommand.
#[derive(Debug, Args)]
pub struct HashArgs {
    /// Image file to fingerprint
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Square hash size (overrides the configured default)
    ///
    /// Must match the size used for stored fingerprints to compare
    /// against them.
    #[arg(long, value_name = "N")]
    pub hash_size: Option<u32>,
}

/// Arguments for the hashdiff subcommand.
#[derive(Debug, Args)]
pub struct HashdiffArgs {
    /// First fingerprint (hex)
    #[arg(value_name = "FP1")]
    pub first: String,

    /// Second fingerprint (hex)
    #[arg(value_name = "FP2")]
    pub second: String,
}

/// Arguments for the stats subcommand.
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Directory holding guild record files
    ///
    /// If not specified, the configured or platform-default data
    /// directory is used.
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}
