//! Telegram conversation layer
//!
//! A teloxide dispatcher drives the dialogue in [`handlers`]; a background
//! sweep expires idle sessions. Webhook transport is used when `WEBHOOK_URL`
//! is set, long polling otherwise.

pub mod handlers;
pub mod keyboards;
pub mod state;

use anyhow::{Context, Result};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::dispatching::dialogue::{InMemStorage, Storage};
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::application::{MovieService, SessionManager};
use crate::infrastructure::config::BotConfig;

pub use handlers::{BotContext, Command, schema};
pub use state::{ListingSession, State};

pub const TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const WEBHOOK_URL_VAR: &str = "WEBHOOK_URL";
pub const PORT_VAR: &str = "PORT";
pub const DEFAULT_PORT: u16 = 8080;

/// Run the bot until the dispatcher stops
pub async fn run(service: MovieService, sessions: SessionManager, config: BotConfig) -> Result<()> {
    let token = std::env::var(TOKEN_VAR).with_context(|| format!("{TOKEN_VAR} must be set"))?;
    let bot = Bot::new(token.clone());

    if config.allowed_user_ids.is_empty() {
        warn!("No allowed user ids configured; every user will be rejected");
    }

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let storage = InMemStorage::<State>::new();
    spawn_session_sweep(bot.clone(), sessions.clone(), storage.clone(), config.sweep_interval());

    let context = Arc::new(BotContext::new(service, sessions, config));
    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![storage, context])
        .default_handler(|update| async move {
            debug!("Unhandled update: {:?}", update.id);
        })
        .enable_ctrlc_handler()
        .build();

    match std::env::var(WEBHOOK_URL_VAR) {
        Ok(base) if !base.trim().is_empty() => {
            let port = std::env::var(PORT_VAR)
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT);
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let url = format!("{}/{}", base.trim().trim_end_matches('/'), token)
                .parse::<url::Url>()
                .context("Invalid webhook URL")?;

            info!("🚀 Starting webhook listener on {}", addr);
            let listener = webhooks::axum(bot, webhooks::Options::new(addr, url))
                .await
                .context("Failed to start webhook listener")?;
            dispatcher
                .dispatch_with_listener(listener, LoggingErrorHandler::with_custom_text("Update listener error"))
                .await;
        }
        _ => {
            info!("🚀 Starting long polling");
            dispatcher.dispatch().await;
        }
    }

    info!("Bot stopped");
    Ok(())
}

/// Every `interval`, drop sessions older than the timeout and tell their users
fn spawn_session_sweep(
    bot: Bot,
    sessions: SessionManager,
    storage: Arc<InMemStorage<State>>,
    interval: std::time::Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(std::time::Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            for session in sessions.expire(Utc::now()).await {
                let chat = ChatId(session.user_id as i64);
                if let Err(e) = storage.clone().remove_dialogue(chat).await {
                    debug!("No dialogue to remove for {}: {:?}", session.user_id, e);
                }
                if let Err(e) = bot.send_message(chat, keyboards::SESSION_TIMED_OUT).await {
                    warn!("Failed to notify user {} of session timeout: {}", session.user_id, e);
                }
            }
        }
    });
}
