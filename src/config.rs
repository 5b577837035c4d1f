//! Configuration management for vidshelf
//!
//! Handles config file loading/saving and feed source resolution.
//! Config is stored at ~/.config/vidshelf/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the feed source
pub const FEED_ENV: &str = "VIDSHELF_FEED";

/// Default result cap for list commands
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Default attempts made when the feed server rate limits
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Remote catalog feed URL
    pub feed_url: Option<String>,
    /// Local catalog feed file (used when no URL is set)
    pub feed_path: Option<PathBuf>,
    /// Maximum results printed by list commands
    pub search_limit: Option<usize>,
    /// Attempts made when the feed server rate limits
    pub max_retries: Option<u32>,
    /// tracing filter used when RUST_LOG is unset (e.g. "vidshelf=debug")
    pub log_filter: Option<String>,
}

impl Config {
    /// Get config file path (~/.config/vidshelf/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vidshelf").join("config.toml"))
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    /// Load config from `path`; missing or invalid files yield defaults
    pub fn load_from(path: &Path) -> Self {
        let config = std::fs::read_to_string(path)
            .ok()
            .and_then(|s| toml::from_str(&s).ok());
        if config.is_none() {
            debug!(path = %path.display(), "no usable config file, using defaults");
        }
        config.unwrap_or_default()
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Resolve the feed source with fallback chain:
    /// 1. Explicit override (the --feed flag)
    /// 2. Environment variable VIDSHELF_FEED
    /// 3. `feed_url`, then `feed_path` from the config file
    pub fn feed_source(&self, explicit: Option<&str>) -> Option<String> {
        if let Some(source) = explicit {
            return Some(source.to_string());
        }

        if let Ok(source) = std::env::var(FEED_ENV) {
            if !source.trim().is_empty() {
                return Some(source);
            }
        }

        self.feed_url.clone().or_else(|| {
            self.feed_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
        })
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }
}
