//! Configuration infrastructure
//!
//! Settings are layered with the `config` crate:
//! 1. Built-in defaults (see [`defaults`])
//! 2. Optional file `config/reelscout.{toml,json,yaml}`
//! 3. Environment variables `REELSCOUT__SECTION__KEY`
//!
//! Telegram credentials are not part of this file; they come from the
//! process environment at bot start-up.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::infrastructure::http_client::HttpClientConfig;

/// Base name of the optional configuration file
pub const CONFIG_FILE_STEM: &str = "config/reelscout";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "REELSCOUT";

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub scraping: ScrapingConfig,
    pub sites: SitesConfig,
    pub bot: BotConfig,
    pub diagnostics: DiagnosticsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Directory receiving log files
    pub directory: PathBuf,

    /// File name prefix; files are `{prefix}_{YYYYmmdd_HHMMSS}.log`
    pub file_prefix: String,

    /// Enable JSON structured logging for the file layer
    pub json_format: bool,

    pub console_output: bool,
    pub file_output: bool,

    /// Maximum number of log files kept after start-up cleanup
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            directory: PathBuf::from(defaults::LOG_DIRECTORY),
            file_prefix: defaults::LOG_FILE_PREFIX.to_string(),
            json_format: false,
            console_output: true,
            file_output: true,
            max_files: defaults::LOG_MAX_FILES,
        }
    }
}

/// Scraping behaviour shared by every site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub http: HttpClientConfig,

    /// Pause before every listing fetch after the first one
    pub page_delay_ms: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            http: HttpClientConfig::default(),
            page_delay_ms: defaults::PAGE_DELAY_MS,
        }
    }
}

impl ScrapingConfig {
    pub const fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

/// Where the site domain table is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitesConfig {
    pub domain_file: PathBuf,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            domain_file: PathBuf::from(defaults::DOMAIN_FILE),
        }
    }
}

/// Conversation layer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Telegram user ids allowed to talk to the bot
    pub allowed_user_ids: Vec<u64>,

    /// Listing pages fetched per request
    pub max_pages: u32,

    /// Titles shown per keyboard page
    pub page_size: usize,

    pub session_timeout_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            allowed_user_ids: Vec::new(),
            max_pages: defaults::BOT_MAX_PAGES,
            page_size: defaults::PAGE_SIZE,
            session_timeout_seconds: defaults::SESSION_TIMEOUT_SECONDS,
            sweep_interval_seconds: defaults::SWEEP_INTERVAL_SECONDS,
        }
    }
}

impl BotConfig {
    pub const fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_seconds)
    }

    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn is_allowed(&self, user_id: u64) -> bool {
        self.allowed_user_ids.contains(&user_id)
    }
}

/// Raw page dumps for pages that parsed to nothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    pub directory: PathBuf,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from(defaults::DIAGNOSTICS_DIRECTORY),
        }
    }
}

impl AppConfig {
    /// Load defaults, then `config/reelscout.*`, then the environment
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE_STEM))
    }

    /// Same as [`AppConfig::load`] with an explicit file stem
    pub fn load_from(file_stem: &Path) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())
            .context("Failed to serialize default configuration")?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(&file_stem.to_string_lossy()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("bot.allowed_user_ids")
                    .with_list_parse_key("scraping.http.user_agents"),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        info!(
            "Configuration loaded: max_pages={}, page_delay_ms={}, timeout={}s",
            config.bot.max_pages, config.scraping.page_delay_ms, config.scraping.http.timeout_seconds
        );
        Ok(config)
    }
}

/// Default configuration values
pub mod defaults {
    pub const LOG_LEVEL: &str = "info";
    pub const LOG_DIRECTORY: &str = "logs";
    pub const LOG_FILE_PREFIX: &str = "bot";
    pub const LOG_MAX_FILES: u32 = 10;

    /// Pause between listing pages in milliseconds
    pub const PAGE_DELAY_MS: u64 = 3000;

    pub const DOMAIN_FILE: &str = "site_config.json";

    pub const BOT_MAX_PAGES: u32 = 1;
    pub const PAGE_SIZE: usize = 5;
    pub const SESSION_TIMEOUT_SECONDS: u64 = 1800;
    pub const SWEEP_INTERVAL_SECONDS: u64 = 60;

    pub const DIAGNOSTICS_DIRECTORY: &str = "debug_pages";
}
