//! RepostDupe - Near-Duplicate Image Repost Detector
//!
//! Fingerprints images attached to chat messages, remembers every
//! fingerprint seen per guild, and flags messages whose image is identical
//! or perceptually close to one already recorded. The chat platform, image
//! download, and hash computation are consumed through narrow collaborator
//! traits; the engine in [`engine`] owns the invariants.

pub mod bot;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod guilds;
pub mod imaging;
pub mod logging;
pub mod platform;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::engine::Fingerprint;
use crate::error::ExitCode;
use crate::guilds::{FileBackend, GuildBackend};
use crate::imaging::{Fingerprinter, PerceptualFingerprinter};

/// Run the maintenance CLI.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    let config = Config::load();

    match cli.command {
        Commands::Hash(args) => {
            let bytes = std::fs::read(&args.file)
                .with_context(|| format!("Failed to read image file: {}", args.file.display()))?;
            let fingerprinter =
                PerceptualFingerprinter::new(args.hash_size.unwrap_or(config.hash_size));
            let fingerprint = fingerprinter
                .fingerprint(&bytes)
                .with_context(|| format!("Failed to fingerprint: {}", args.file.display()))?;
            println!("{fingerprint} ({} bits)", fingerprint.bit_len());
        }
        Commands::Hashdiff(args) => {
            let first = Fingerprint::from_hex(&args.first).context("First fingerprint")?;
            let second = Fingerprint::from_hex(&args.second).context("Second fingerprint")?;
            let distance = first.distance(&second)?;
            println!("{distance}");
        }
        Commands::Stats(args) => {
            let dir = match args.data_dir {
                Some(dir) => dir,
                None => config.resolve_data_dir()?,
            };
            let backend = FileBackend::new(&dir)?;
            let keys = backend.list()?;
            if keys.is_empty() {
                println!("No guild records in {}", dir.display());
            }
            for key in keys {
                let record = backend.load(&key)?;
                let covered: usize = record.ranges.values().map(engine::RangeSet::len).sum();
                println!(
                    "{key}: {} fingerprints, {} locations, {} channels covered ({} ranges), \
                     enabled: {}, {} channels checked",
                    record.fingerprints.len(),
                    record.fingerprints.location_count(),
                    record.ranges.len(),
                    covered,
                    record.enabled,
                    record.included_channels.len()
                );
            }
        }
    }

    Ok(ExitCode::Success)
}
