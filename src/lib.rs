//! ReelScout - Telegram bot for browsing movie listing sites
//!
//! Scrapes listings and download links from several movie sites and serves
//! them to an allow-listed set of Telegram users.

pub mod application;
pub mod bot;
pub mod domain;
pub mod infrastructure;

use anyhow::Result;
use tracing::info;

use crate::application::{MovieService, SessionManager};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::logging::{init_logging_with_config, log_system_info};

/// Load configuration, initialize logging and run the bot
pub async fn run() -> Result<()> {
    let config = AppConfig::load()?;

    if let Err(e) = init_logging_with_config(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
    }
    log_system_info();

    let service = MovieService::from_config(&config);
    let sessions = SessionManager::new(config.bot.session_timeout());
    for site in domain::SiteKey::ALL {
        info!("{} → {}", site.display_name(), service.current_domain(site));
    }

    bot::run(service, sessions, config.bot).await
}
