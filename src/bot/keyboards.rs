//! Reply texts, inline keyboards and message chunking
//!
//! Everything here is pure so it can be tested without a bot.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::domain::{BrowseMode, SiteKey};

/// Chunk size kept below Telegram's 4096 character limit
pub const CHUNK_LIMIT: usize = 4000;

pub const UNAUTHORIZED: &str = "Unauthorized access. Contact admin.";
pub const SESSION_ACTIVE: &str = "Session already active. Use /cancel to end it.";
pub const SESSION_EXPIRED: &str = "Session expired. Use /start to begin.";
pub const SESSION_TIMED_OUT: &str = "Session timed out. Use /start to begin again.";
pub const CHOOSE_MODE: &str = "Choose an option:";
pub const CANCELLED: &str = "Operation cancelled.";
pub const ENTER_MOVIE_NAME: &str = "Enter movie name:";
pub const EMPTY_MOVIE_NAME: &str = "Movie name cannot be empty. Try again:";
pub const NO_MOVIES: &str = "No movies found. Try another site or name.";
pub const FETCH_MOVIES_FAILED: &str = "Error fetching movies. Try again later.";
pub const FETCH_LINKS_FAILED: &str = "Error fetching download links. Try again later.";
pub const DOWNLOAD_LINKS_HEADER: &str = "Download Links:";
pub const NO_DOWNLOAD_LINKS: &str = "No download links found.";
pub const INVALID_SELECTION: &str = "Invalid selection. Try again.";
pub const INVALID_INPUT: &str = "Invalid input. Select a movie number.";
pub const SELECT_DOMAIN_SITE: &str = "Select site to update domain:";
pub const DOMAIN_UPDATE_CANCELLED: &str = "Domain update cancelled.";

pub const CALLBACK_CANCEL: &str = "cancel";
pub const CALLBACK_BACK: &str = "back";
pub const CALLBACK_NEXT: &str = "next";
pub const CALLBACK_PREVIOUS: &str = "prev";

pub const COMMAND_LIST: &str = "/start - Start a new movie search\n\
/latest - View the latest movies\n\
/cancel - Cancel the current operation\n\
/update_domain - Update the domain for a specific site\n\
/cmd - Display this command list";

pub fn select_site_prompt(mode: BrowseMode) -> String {
    format!("Select a site for {}:", mode.as_str())
}

pub fn enter_domain_prompt(site: SiteKey) -> String {
    format!("Enter new domain for {site} (e.g., hdmovie2.new):")
}

pub fn domain_updated(site: SiteKey, domain: &str) -> String {
    format!("Domain for {site} updated to {domain}.")
}

pub fn domain_update_failed(site: SiteKey) -> String {
    format!("Failed to update domain for {site}. Try again.")
}

/// `"Download Links:\n\n..."` or the empty-result text
pub fn download_links_text(lines: &[String]) -> String {
    if lines.is_empty() {
        NO_DOWNLOAD_LINKS.to_string()
    } else {
        format!("{}\n\n{}", DOWNLOAD_LINKS_HEADER, lines.join("\n"))
    }
}

pub fn mode_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("Latest Movies", BrowseMode::Latest.as_str())],
        vec![InlineKeyboardButton::callback("Search Movies", BrowseMode::Search.as_str())],
    ])
}

/// One row per site plus Cancel
pub fn site_keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = SiteKey::ALL
        .iter()
        .map(|site| vec![InlineKeyboardButton::callback(site.display_name(), site.as_str())])
        .collect();
    rows.push(vec![InlineKeyboardButton::callback("Cancel", CALLBACK_CANCEL)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn back_to_movies_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "Back to Movies",
        CALLBACK_BACK,
    )]])
}

/// One keyboard page of a listing
#[derive(Debug, Clone, Copy)]
pub struct ListingPageView<'a> {
    titles: &'a [String],
    page: usize,
    page_size: usize,
}

impl<'a> ListingPageView<'a> {
    /// `page` is clamped into the valid range
    pub fn new(titles: &'a [String], page: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let pages = titles.len().div_ceil(page_size).max(1);
        Self {
            titles,
            page: page.clamp(1, pages),
            page_size,
        }
    }

    pub const fn page(&self) -> usize {
        self.page
    }

    fn start(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    fn end(&self) -> usize {
        (self.start() + self.page_size).min(self.titles.len())
    }

    pub fn visible(&self) -> &'a [String] {
        &self.titles[self.start().min(self.titles.len())..self.end()]
    }

    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.end() < self.titles.len()
    }

    pub fn text(&self, mode: BrowseMode) -> String {
        let heading = match mode {
            BrowseMode::Latest => "Latest",
            BrowseMode::Search => "Search",
        };
        format!("{} Movies (Page {}):\n\n{}", heading, self.page, self.visible().join("\n"))
    }

    /// Title buttons carry their 1-based overall index
    pub fn keyboard(&self) -> InlineKeyboardMarkup {
        let start = self.start();
        let mut rows: Vec<Vec<InlineKeyboardButton>> = self
            .visible()
            .iter()
            .enumerate()
            .map(|(i, title)| vec![InlineKeyboardButton::callback(title.clone(), (start + i + 1).to_string())])
            .collect();

        let mut nav = Vec::new();
        if self.has_previous() {
            nav.push(InlineKeyboardButton::callback("Previous", CALLBACK_PREVIOUS));
        }
        if self.has_next() {
            nav.push(InlineKeyboardButton::callback("Next", CALLBACK_NEXT));
        }
        nav.push(InlineKeyboardButton::callback("Back", CALLBACK_BACK));
        rows.push(nav);

        InlineKeyboardMarkup::new(rows)
    }
}

/// Split on line boundaries into chunks of at most `limit` characters.
/// A single line longer than `limit` is split by characters. Chunks holding
/// only whitespace are dropped since Telegram refuses empty text.
pub fn chunk_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        if !current.is_empty() {
            push_chunk(&mut chunks, std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
        } else {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                push_chunk(&mut chunks, piece.iter().collect());
            }
        }
    }

    push_chunk(&mut chunks, current);
    chunks
}

fn push_chunk(chunks: &mut Vec<String>, chunk: String) {
    if !chunk.trim().is_empty() {
        chunks.push(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn titles(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{i}. Movie {i}")).collect()
    }

    fn callbacks(markup: &InlineKeyboardMarkup) -> Vec<Vec<String>> {
        markup
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| match &b.kind {
                        InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
                        _ => String::new(),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn first_page_shows_five_titles_and_next() {
        let all = titles(12);
        let view = ListingPageView::new(&all, 1, 5);
        assert_eq!(view.visible().len(), 5);
        assert_eq!(
            callbacks(&view.keyboard()),
            vec![
                vec!["1"],
                vec!["2"],
                vec!["3"],
                vec!["4"],
                vec!["5"],
                vec!["next", "back"],
            ]
        );
        assert!(view.text(BrowseMode::Latest).starts_with("Latest Movies (Page 1):\n\n1. Movie 1\n"));
    }

    #[test]
    fn last_page_has_previous_only() {
        let all = titles(12);
        let view = ListingPageView::new(&all, 3, 5);
        assert_eq!(view.visible(), &all[10..12]);
        let rows = callbacks(&view.keyboard());
        assert_eq!(rows[0], vec!["11"]);
        assert_eq!(rows.last().unwrap(), &vec!["prev", "back"]);
    }

    #[test]
    fn page_is_clamped() {
        let all = titles(3);
        assert_eq!(ListingPageView::new(&all, 9, 5).page(), 1);
        assert_eq!(ListingPageView::new(&all, 0, 5).page(), 1);
    }

    #[test]
    fn site_keyboard_lists_sites_then_cancel() {
        assert_eq!(
            callbacks(&site_keyboard()),
            vec![vec!["cinevood"], vec!["hdhub4u"], vec!["hdmovie2"], vec!["cancel"]]
        );
    }

    #[test]
    fn download_text_has_header_or_empty_message() {
        assert_eq!(download_links_text(&[]), NO_DOWNLOAD_LINKS);
        let lines = vec!["1. a".to_string(), "2. b".to_string()];
        assert_eq!(download_links_text(&lines), "Download Links:\n\n1. a\n2. b");
    }

    #[test]
    fn short_message_is_one_chunk() {
        assert_eq!(chunk_message("hello\nworld", CHUNK_LIMIT), vec!["hello\nworld"]);
        assert!(chunk_message("", CHUNK_LIMIT).is_empty());
    }

    #[test]
    fn blank_line_at_a_boundary_does_not_become_its_own_chunk() {
        let first = "Download Links:\n\n1.) **a** : u\n";
        let limit = first.chars().count();

        assert_eq!(chunk_message(&format!("{first}\n"), limit), vec![first]);
        assert_eq!(
            chunk_message(&format!("{first}\n2.) **b** : v\n"), limit),
            vec![first, "\n2.) **b** : v\n"]
        );
        assert!(chunk_message("\n\n\n", 1).is_empty());
    }

    #[test]
    fn long_line_is_split_by_characters() {
        let line = "x".repeat(10);
        assert_eq!(chunk_message(&line, 4), vec!["xxxx", "xxxx", "xx"]);
    }

    proptest! {
        #[test]
        fn chunks_respect_limit_and_preserve_text(lines in proptest::collection::vec("[a-z ]{0,60}", 0..40), limit in 10usize..200) {
            let text = lines.join("\n");
            let chunks = chunk_message(&text, limit);
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= limit);
                prop_assert!(!chunk.trim().is_empty());
            }
            let visible = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
            prop_assert_eq!(visible(&chunks.concat()), visible(&text));
        }
    }
}
