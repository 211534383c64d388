//! Application configuration management.
//!
//! Settings are loaded from a JSON file under the platform config
//! directory; every field has a default, and any load failure falls back to
//! the defaults so a broken config never stops the process.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Bot and engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Word that addresses the bot in chat (`<prefix> scan ...`).
    pub command_prefix: String,
    /// Hamming-distance threshold for live repost matching; a stored
    /// fingerprint strictly closer than this counts. 0 means exact only.
    pub match_threshold: u32,
    /// Square perceptual-hash size; 16 yields 256-bit fingerprints.
    /// Changing this invalidates stored fingerprints (sizes must match).
    pub hash_size: u32,
    /// Messages per history page during scans.
    pub page_size: usize,
    /// Text posted when a repost is detected.
    pub repost_notice: String,
    /// Where guild records are stored; defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_prefix: "reposti".to_string(),
            match_threshold: 20,
            hash_size: 16,
            page_size: 100,
            repost_notice: "Repost detected.".to_string(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load the configuration from the default platform-specific path.
    #[must_use]
    pub fn load() -> Self {
        match Self::load_internal() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    fn load_internal() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save the configuration to the default platform-specific path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the guild-record directory: the configured override, or the
    /// platform data dir.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let project_dirs = Self::project_dirs()?;
        Ok(project_dirs.data_dir().join("guilds"))
    }

    /// Get the default platform-specific configuration path.
    fn config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.json"))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "repostdupe", "repostdupe")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.command_prefix, "reposti");
        assert_eq!(config.match_threshold, 20);
        assert_eq!(config.hash_size, 16);
        assert_eq!(config.page_size, 100);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"match_threshold": 5}"#).unwrap();
        assert_eq!(config.match_threshold, 5);
        assert_eq!(config.command_prefix, "reposti");
    }
}
