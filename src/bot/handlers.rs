//! Dialogue handlers
//!
//! Commands are accepted in every state. Callback queries and free-text
//! messages are routed by the current [`State`].

use chrono::Utc;
use std::sync::Arc;
use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use crate::application::{MovieService, SessionManager};
use crate::bot::keyboards::{self, ListingPageView};
use crate::bot::state::{ListingSession, State};
use crate::domain::{BrowseMode, SiteKey};
use crate::infrastructure::config::BotConfig;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type HandlerResult = Result<(), HandlerError>;
pub type MyDialogue = Dialogue<State, InMemStorage<State>>;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "Start a new movie search")]
    Start,
    #[command(description = "View the latest movies")]
    Latest,
    #[command(description = "Cancel the current operation")]
    Cancel,
    #[command(description = "Update the domain for a specific site")]
    UpdateDomain,
    #[command(description = "Display this command list")]
    Cmd,
}

/// Shared collaborators injected into every handler
pub struct BotContext {
    pub service: MovieService,
    pub sessions: SessionManager,
    pub config: BotConfig,
}

impl BotContext {
    pub const fn new(service: MovieService, sessions: SessionManager, config: BotConfig) -> Self {
        Self {
            service,
            sessions,
            config,
        }
    }

    fn allows(&self, user: Option<&teloxide::types::User>) -> bool {
        user.is_some_and(|u| self.config.is_allowed(u.id.0))
    }
}

/// Where a reply goes: a fresh message or an edit of the message carrying the keyboard
#[derive(Debug, Clone, Copy)]
enum Reply {
    Send(ChatId),
    Edit(ChatId, MessageId),
}

impl Reply {
    fn for_callback(q: &CallbackQuery) -> Option<Self> {
        q.regular_message().map(|m| Self::Edit(m.chat.id, m.id))
    }

    const fn chat_id(self) -> ChatId {
        match self {
            Self::Send(chat) | Self::Edit(chat, _) => chat,
        }
    }
}

async fn respond(bot: &Bot, reply: Reply, text: &str, markup: Option<InlineKeyboardMarkup>) -> HandlerResult {
    match (reply, markup) {
        (Reply::Send(chat), Some(markup)) => {
            bot.send_message(chat, text).reply_markup(markup).await?;
        }
        (Reply::Send(chat), None) => {
            bot.send_message(chat, text).await?;
        }
        (Reply::Edit(chat, id), Some(markup)) => {
            bot.edit_message_text(chat, id, text).reply_markup(markup).await?;
        }
        (Reply::Edit(chat, id), None) => {
            bot.edit_message_text(chat, id, text).await?;
        }
    }
    Ok(())
}

/// First chunk goes through `reply`, the rest as new messages; the keyboard rides on the last one
async fn respond_chunked(bot: &Bot, reply: Reply, text: &str, markup: Option<InlineKeyboardMarkup>) -> HandlerResult {
    let chunks = keyboards::chunk_message(text, keyboards::CHUNK_LIMIT);
    let last = chunks.len().saturating_sub(1);
    let mut markup = markup;

    for (i, chunk) in chunks.iter().enumerate() {
        let target = if i == 0 { reply } else { Reply::Send(reply.chat_id()) };
        let keyboard = if i == last { markup.take() } else { None };
        respond(bot, target, chunk, keyboard).await?;
    }
    Ok(())
}

pub fn schema() -> UpdateHandler<HandlerError> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Latest].endpoint(start))
        .branch(case![Command::Cancel].endpoint(cancel))
        .branch(case![Command::UpdateDomain].endpoint(update_domain))
        .branch(case![Command::Cmd].endpoint(command_list));

    let message_handler = Update::filter_message()
        .branch(
            dptree::filter(|msg: Message, ctx: Arc<BotContext>| !ctx.allows(msg.from.as_ref()))
                .endpoint(reject_message),
        )
        .branch(command_handler)
        .branch(case![State::MovieSearch(site)].endpoint(receive_search))
        .branch(case![State::DomainInput(site)].endpoint(receive_domain));

    let callback_handler = Update::filter_callback_query()
        .branch(
            dptree::filter(|q: CallbackQuery, ctx: Arc<BotContext>| !ctx.allows(Some(&q.from)))
                .endpoint(reject_callback),
        )
        .branch(case![State::ModeSelection].endpoint(select_mode))
        .branch(case![State::SiteSelection(mode)].endpoint(select_site))
        .branch(case![State::MovieSelection(listing)].endpoint(select_movie))
        .branch(case![State::DomainSiteSelection].endpoint(select_domain_site))
        .branch(dptree::endpoint(stale_callback));

    dialogue::enter::<Update, InMemStorage<State>, State, _>()
        .branch(message_handler)
        .branch(callback_handler)
}

async fn reject_message(bot: Bot, msg: Message) -> HandlerResult {
    warn!("Rejected message from unauthorized user {:?}", msg.from.as_ref().map(|u| u.id));
    bot.send_message(msg.chat.id, keyboards::UNAUTHORIZED).await?;
    Ok(())
}

async fn reject_callback(bot: Bot, q: CallbackQuery) -> HandlerResult {
    warn!("Rejected callback from unauthorized user {}", q.from.id);
    bot.answer_callback_query(q.id.clone()).await?;
    if let Some(reply) = Reply::for_callback(&q) {
        respond(&bot, Reply::Send(reply.chat_id()), keyboards::UNAUTHORIZED, None).await?;
    }
    Ok(())
}

async fn start(bot: Bot, dialogue: MyDialogue, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    if ctx.sessions.begin(user.id.0, Utc::now()).await.is_err() {
        bot.send_message(msg.chat.id, keyboards::SESSION_ACTIVE).await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, keyboards::CHOOSE_MODE)
        .reply_markup(keyboards::mode_keyboard())
        .await?;
    dialogue.update(State::ModeSelection).await?;
    Ok(())
}

async fn cancel(bot: Bot, dialogue: MyDialogue, msg: Message, ctx: Arc<BotContext>) -> HandlerResult {
    if let Some(user) = msg.from.as_ref() {
        ctx.sessions.end(user.id.0).await;
    }
    dialogue.exit().await?;
    bot.send_message(msg.chat.id, keyboards::CANCELLED).await?;
    Ok(())
}

async fn update_domain(bot: Bot, dialogue: MyDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, keyboards::SELECT_DOMAIN_SITE)
        .reply_markup(keyboards::site_keyboard())
        .await?;
    dialogue.update(State::DomainSiteSelection).await?;
    Ok(())
}

async fn command_list(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, keyboards::COMMAND_LIST).await?;
    Ok(())
}

/// `true` when the user still has a session; otherwise tells them and resets the dialogue
async fn ensure_session(bot: &Bot, dialogue: &MyDialogue, ctx: &BotContext, user_id: u64, reply: Reply) -> Result<bool, HandlerError> {
    if ctx.sessions.is_active(user_id).await {
        return Ok(true);
    }
    respond(bot, Reply::Send(reply.chat_id()), keyboards::SESSION_EXPIRED, None).await?;
    dialogue.exit().await?;
    Ok(false)
}

async fn end_with(bot: &Bot, dialogue: &MyDialogue, ctx: &BotContext, user_id: u64, reply: Reply, text: &str) -> HandlerResult {
    ctx.sessions.end(user_id).await;
    dialogue.exit().await?;
    respond(bot, reply, text, None).await
}

async fn select_mode(bot: Bot, dialogue: MyDialogue, q: CallbackQuery, ctx: Arc<BotContext>) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let Some(reply) = Reply::for_callback(&q) else {
        return Ok(());
    };
    if !ensure_session(&bot, &dialogue, &ctx, q.from.id.0, reply).await? {
        return Ok(());
    }

    let Some(mode) = q.data.as_deref().and_then(BrowseMode::from_callback) else {
        return Ok(());
    };

    respond(&bot, reply, &keyboards::select_site_prompt(mode), Some(keyboards::site_keyboard())).await?;
    dialogue.update(State::SiteSelection(mode)).await?;
    Ok(())
}

async fn select_site(
    bot: Bot,
    dialogue: MyDialogue,
    mode: BrowseMode,
    q: CallbackQuery,
    ctx: Arc<BotContext>,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let Some(reply) = Reply::for_callback(&q) else {
        return Ok(());
    };
    let user_id = q.from.id.0;
    if !ensure_session(&bot, &dialogue, &ctx, user_id, reply).await? {
        return Ok(());
    }

    let data = q.data.as_deref().unwrap_or_default();
    if data == keyboards::CALLBACK_CANCEL {
        return end_with(&bot, &dialogue, &ctx, user_id, reply, keyboards::CANCELLED).await;
    }

    let Ok(site) = data.parse::<SiteKey>() else {
        return Ok(());
    };

    match mode {
        BrowseMode::Search => {
            respond(&bot, reply, keyboards::ENTER_MOVIE_NAME, None).await?;
            dialogue.update(State::MovieSearch(site)).await?;
            Ok(())
        }
        BrowseMode::Latest => show_listing(&bot, &dialogue, &ctx, user_id, reply, site, mode, None).await,
    }
}

async fn receive_search(
    bot: Bot,
    dialogue: MyDialogue,
    site: SiteKey,
    msg: Message,
    ctx: Arc<BotContext>,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let reply = Reply::Send(msg.chat.id);
    if !ensure_session(&bot, &dialogue, &ctx, user.id.0, reply).await? {
        return Ok(());
    }

    let query = msg.text().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        bot.send_message(msg.chat.id, keyboards::EMPTY_MOVIE_NAME).await?;
        return Ok(());
    }

    show_listing(&bot, &dialogue, &ctx, user.id.0, reply, site, BrowseMode::Search, Some(query.to_string())).await
}

/// Enumerate one site and show the first keyboard page
async fn show_listing(
    bot: &Bot,
    dialogue: &MyDialogue,
    ctx: &BotContext,
    user_id: u64,
    reply: Reply,
    site: SiteKey,
    mode: BrowseMode,
    search: Option<String>,
) -> HandlerResult {
    let service = ctx.service.clone();
    let task = tokio::spawn(async move { service.list_movies(site, search.as_deref()).await });

    let listing = match task.await {
        Ok(listing) => listing,
        Err(e) => {
            error!("Listing task for {} failed: {}", site, e);
            return end_with(bot, dialogue, ctx, user_id, reply, keyboards::FETCH_MOVIES_FAILED).await;
        }
    };

    if listing.is_empty() {
        info!("No movies found on {} for user {}", site, user_id);
        respond(bot, reply, keyboards::NO_MOVIES, Some(keyboards::site_keyboard())).await?;
        dialogue.update(State::SiteSelection(mode)).await?;
        return Ok(());
    }

    let session = ListingSession::new(site, mode, listing);
    show_page(bot, reply, &session, ctx.config.page_size).await?;
    dialogue.update(State::MovieSelection(session)).await?;
    Ok(())
}

async fn show_page(bot: &Bot, reply: Reply, session: &ListingSession, page_size: usize) -> HandlerResult {
    let view = ListingPageView::new(&session.titles, session.page, page_size);
    respond(bot, reply, &view.text(session.mode), Some(view.keyboard())).await
}

async fn select_movie(
    bot: Bot,
    dialogue: MyDialogue,
    mut listing: ListingSession,
    q: CallbackQuery,
    ctx: Arc<BotContext>,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let Some(reply) = Reply::for_callback(&q) else {
        return Ok(());
    };
    let user_id = q.from.id.0;
    if !ensure_session(&bot, &dialogue, &ctx, user_id, reply).await? {
        return Ok(());
    }

    let data = q.data.as_deref().unwrap_or_default();
    match data {
        keyboards::CALLBACK_NEXT | keyboards::CALLBACK_PREVIOUS => {
            let page = if data == keyboards::CALLBACK_NEXT {
                listing.page + 1
            } else {
                listing.page.saturating_sub(1)
            };
            listing.page = ListingPageView::new(&listing.titles, page, ctx.config.page_size).page();
            show_page(&bot, reply, &listing, ctx.config.page_size).await?;
            dialogue.update(State::MovieSelection(listing)).await?;
            Ok(())
        }
        keyboards::CALLBACK_BACK => {
            respond(
                &bot,
                reply,
                &keyboards::select_site_prompt(listing.mode),
                Some(keyboards::site_keyboard()),
            )
            .await?;
            dialogue.update(State::SiteSelection(listing.mode)).await?;
            Ok(())
        }
        keyboards::CALLBACK_CANCEL => end_with(&bot, &dialogue, &ctx, user_id, reply, keyboards::CANCELLED).await,
        other => {
            let Ok(selection) = other.parse::<usize>() else {
                return respond(&bot, reply, keyboards::INVALID_INPUT, None).await;
            };
            let Some(detail_url) = listing.link(selection).map(str::to_string) else {
                return respond(&bot, reply, keyboards::INVALID_SELECTION, None).await;
            };

            let service = ctx.service.clone();
            let site = listing.site;
            let task = tokio::spawn(async move { service.download_links(site, &detail_url).await });

            match task.await {
                Ok(lines) => {
                    let text = keyboards::download_links_text(&lines);
                    respond_chunked(&bot, reply, &text, Some(keyboards::back_to_movies_keyboard())).await
                }
                Err(e) => {
                    error!("Download link task for {} failed: {}", site, e);
                    end_with(&bot, &dialogue, &ctx, user_id, reply, keyboards::FETCH_LINKS_FAILED).await
                }
            }
        }
    }
}

async fn select_domain_site(bot: Bot, dialogue: MyDialogue, q: CallbackQuery) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    let Some(reply) = Reply::for_callback(&q) else {
        return Ok(());
    };

    let data = q.data.as_deref().unwrap_or_default();
    if data == keyboards::CALLBACK_CANCEL {
        dialogue.exit().await?;
        return respond(&bot, reply, keyboards::DOMAIN_UPDATE_CANCELLED, None).await;
    }

    let Ok(site) = data.parse::<SiteKey>() else {
        return Ok(());
    };
    respond(&bot, reply, &keyboards::enter_domain_prompt(site), None).await?;
    dialogue.update(State::DomainInput(site)).await?;
    Ok(())
}

async fn receive_domain(
    bot: Bot,
    dialogue: MyDialogue,
    site: SiteKey,
    msg: Message,
    ctx: Arc<BotContext>,
) -> HandlerResult {
    let raw = msg.text().unwrap_or_default();
    let text = match ctx.service.update_domain(site, raw) {
        Ok(domain) => keyboards::domain_updated(site, &domain),
        Err(e) => {
            warn!("Rejected domain update for {}: {}", site, e);
            keyboards::domain_update_failed(site)
        }
    };

    bot.send_message(msg.chat.id, text).await?;
    dialogue.exit().await?;
    Ok(())
}

/// Button pressed on a keyboard whose conversation already ended
async fn stale_callback(bot: Bot, q: CallbackQuery) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;
    if let Some(reply) = Reply::for_callback(&q) {
        respond(&bot, Reply::Send(reply.chat_id()), keyboards::SESSION_EXPIRED, None).await?;
    }
    Ok(())
}
