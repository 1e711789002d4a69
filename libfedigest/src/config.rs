//! Configuration management for Fedigest

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub instance: InstanceConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Base URL of the instance, e.g. "https://mastodon.social".
    pub url: String,
    /// Path to a file holding the OAuth access token.
    pub token_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Directory report files are written into.
    pub dir: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            dir: "~/.local/share/fedigest/reports".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Items requested per page. Instances may clamp this to their own cap.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Seconds slept between page fetches to stay under burst limits.
    #[serde(default = "default_pacing_secs")]
    pub pacing_secs: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            pacing_secs: default_pacing_secs(),
        }
    }
}

fn default_page_size() -> u32 {
    200
}

fn default_pacing_secs() -> u64 {
    1
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            instance: InstanceConfig {
                url: "https://mastodon.social".to_string(),
                token_file: "~/.config/fedigest/access.token".to_string(),
            },
            reports: ReportsConfig::default(),
            collection: CollectionConfig::default(),
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("FEDIGEST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("fedigest").join("config.toml"))
}
