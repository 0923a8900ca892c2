//! Download-link extraction primitives
//!
//! A site describes extraction as an ordered chain of strategies. The first
//! strategy that yields a non-empty result wins; later ones are not run.
//! This module also holds the sibling-walk helpers shared by heading-based
//! layouts and the numbering/rendering step applied to the winning result.

use scraper::ElementRef;
use tracing::debug;

use super::markup::{
    Document, attr, contains_any_marker, find_all, find_first, has_any_class, is_tag,
    next_element_siblings, parent_element, prev_element_siblings, text_of,
};
use crate::domain::{DownloadEntry, RawDownload};

/// Characters escaped for Telegram MarkdownV2
const MARKDOWN_V2_SPECIAL: &str = "_*[]()~`>#+-=|{}.!";

/// One extraction approach over a parsed detail page
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub run: fn(&Document) -> Vec<RawDownload>,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// Run strategies in order and return the first non-empty result
pub fn run_chain(document: &Document, chain: &[Strategy]) -> Vec<RawDownload> {
    for strategy in chain {
        let found = (strategy.run)(document);
        if !found.is_empty() {
            debug!("Strategy '{}' produced {} links", strategy.name, found.len());
            return found;
        }
        debug!("Strategy '{}' found nothing", strategy.name);
    }
    Vec::new()
}

/// Display line layout for numbered entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// `"{n}. {description} [{label}]: {url}"`
    Bracketed,
    /// `"{n}) **{description}** : {url}\n"`
    BoldParen,
    /// `"{n}.) **{description}** : {url}\n\n"`
    BoldDotParen,
}

impl LinkStyle {
    pub fn render(self, ordinal: usize, download: &RawDownload) -> String {
        match self {
            Self::Bracketed => match &download.label {
                Some(label) => format!("{}. {} [{}]: {}", ordinal, download.description, label, download.url),
                None => format!("{}. {}: {}", ordinal, download.description, download.url),
            },
            Self::BoldParen => format!("{}) **{}** : {}\n", ordinal, download.description, download.url),
            Self::BoldDotParen => format!("{}.) **{}** : {}\n\n", ordinal, download.description, download.url),
        }
    }
}

/// Number downloads densely from 1 and render each line
pub fn number_downloads(downloads: Vec<RawDownload>, style: LinkStyle) -> Vec<DownloadEntry> {
    downloads
        .into_iter()
        .enumerate()
        .map(|(index, download)| {
            let ordinal = index + 1;
            let line = style.render(ordinal, &download);
            DownloadEntry {
                ordinal,
                description: download.description,
                label: download.label,
                url: download.url,
                line,
            }
        })
        .collect()
}

pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Rules for heading/button layouts
#[derive(Debug, Clone, Copy)]
pub struct SiblingWalk {
    /// Tag that opens (and closes) a quality group
    pub heading_tag: &'static str,
    /// Anchor classes that mark a download button
    pub button_classes: &'static [&'static str],
    /// Nested caption selector inside a button
    pub caption: &'static str,
    pub default_caption: &'static str,
    /// Button captions that are never downloads
    pub caption_blocklist: &'static [&'static str],
}

impl SiblingWalk {
    pub fn is_button(&self, element: ElementRef<'_>) -> bool {
        is_tag(element, "a") && has_any_class(element, self.button_classes)
    }

    /// Caption of a button, or `None` for missing href / blocked caption
    pub fn button(&self, description: &str, anchor: ElementRef<'_>) -> Option<RawDownload> {
        let href = attr(anchor, "href")?.trim();
        if href.is_empty() {
            return None;
        }

        let caption = find_first(anchor, self.caption)
            .map(text_of)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| self.default_caption.to_string());

        if contains_any_marker(&caption, self.caption_blocklist) {
            debug!("Skipping blocked button '{}'", caption);
            return None;
        }

        Some(RawDownload::new(description, Some(caption), href))
    }

    /// Buttons between `heading` and the next heading of the same tag
    pub fn collect_after(&self, heading: ElementRef<'_>, description: &str) -> Vec<RawDownload> {
        let mut found = Vec::new();
        for sibling in next_element_siblings(heading) {
            if is_tag(sibling, self.heading_tag) {
                break;
            }
            if self.is_button(sibling) {
                found.extend(self.button(description, sibling));
            } else if is_tag(sibling, "p") {
                for anchor in find_all(sibling, "a") {
                    if self.is_button(anchor) {
                        found.extend(self.button(description, anchor));
                    }
                }
            }
        }
        found
    }

    /// Nearest preceding heading of a button. When the button sits inside a
    /// paragraph the paragraph's own preceding siblings are searched as well.
    pub fn heading_before(&self, anchor: ElementRef<'_>) -> Option<String> {
        let own = prev_element_siblings(anchor).find(|el| is_tag(*el, self.heading_tag));
        let wrapped = || {
            parent_element(anchor)
                .filter(|parent| is_tag(*parent, "p"))
                .and_then(|p| prev_element_siblings(p).find(|el| is_tag(*el, self.heading_tag)))
        };
        own.or_else(wrapped).map(text_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALK: SiblingWalk = SiblingWalk {
        heading_tag: "h6",
        button_classes: &["maxbutton-8", "maxbutton-9"],
        caption: "span.mb-text",
        default_caption: "Download",
        caption_blocklist: &["watch online", "trailer"],
    };

    fn nothing(_: &Document) -> Vec<RawDownload> {
        Vec::new()
    }

    fn one(_: &Document) -> Vec<RawDownload> {
        vec![RawDownload::new("first", None, "https://a")]
    }

    fn two(_: &Document) -> Vec<RawDownload> {
        vec![RawDownload::new("second", None, "https://b")]
    }

    #[test]
    fn chain_stops_at_first_non_empty_strategy() {
        let doc = Document::parse("<p></p>");
        let chain = [
            Strategy { name: "empty", run: nothing },
            Strategy { name: "one", run: one },
            Strategy { name: "two", run: two },
        ];
        let found = run_chain(&doc, &chain);
        assert_eq!(found, one(&doc));
    }

    #[test]
    fn chain_of_empty_strategies_is_empty() {
        let doc = Document::parse("<p></p>");
        assert!(run_chain(&doc, &[Strategy { name: "empty", run: nothing }]).is_empty());
    }

    #[test]
    fn renders_each_style() {
        let item = RawDownload::new("1080p", Some("G-Drive".into()), "https://d");
        assert_eq!(LinkStyle::Bracketed.render(3, &item), "3. 1080p [G-Drive]: https://d");
        assert_eq!(LinkStyle::BoldParen.render(1, &item), "1) **1080p** : https://d\n");
        assert_eq!(LinkStyle::BoldDotParen.render(2, &item), "2.) **1080p** : https://d\n\n");
    }

    #[test]
    fn numbering_is_dense() {
        let entries = number_downloads(
            vec![
                RawDownload::new("a", None, "u1"),
                RawDownload::new("b", None, "u2"),
            ],
            LinkStyle::BoldParen,
        );
        let ordinals: Vec<_> = entries.iter().map(|e| e.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2]);
        assert_eq!(entries[1].to_string(), "2) **b** : u2\n");
    }

    #[test]
    fn escapes_markdown_v2_specials() {
        assert_eq!(escape_markdown_v2("720p [x264].mkv!"), "720p \\[x264\\]\\.mkv\\!");
        assert_eq!(escape_markdown_v2("plain"), "plain");
    }

    #[test]
    fn walk_collects_until_next_heading() {
        let doc = Document::parse(
            r#"<div>
                <h6>1080p BluRay</h6>
                <a class="maxbutton-8" href="https://one"><span class="mb-text">Part 1</span></a>
                <p><a class="maxbutton-9" href="https://two"><span class="mb-text">Part 2</span></a>
                   <a class="other" href="https://skip">x</a></p>
                <h6>720p</h6>
                <a class="maxbutton-8" href="https://three"></a>
            </div>"#,
        );
        let heading = doc.find_first("h6").expect("heading");
        let found = WALK.collect_after(heading, "1080p BluRay");
        assert_eq!(
            found,
            vec![
                RawDownload::new("1080p BluRay", Some("Part 1".into()), "https://one"),
                RawDownload::new("1080p BluRay", Some("Part 2".into()), "https://two"),
            ]
        );
    }

    #[test]
    fn walk_defaults_caption_and_drops_blocked_buttons() {
        let doc = Document::parse(
            r#"<div><h6>480p</h6>
                <a class="maxbutton-8" href="https://plain"></a>
                <a class="maxbutton-8" href="https://watch"><span class="mb-text">Watch Online</span></a>
            </div>"#,
        );
        let heading = doc.find_first("h6").expect("heading");
        let found = WALK.collect_after(heading, "480p");
        assert_eq!(found, vec![RawDownload::new("480p", Some("Download".into()), "https://plain")]);
    }

    #[test]
    fn heading_before_looks_through_wrapping_paragraph() {
        let doc = Document::parse(
            r#"<div><h6>2160p</h6><p><a class="maxbutton-9" href="https://x">Get</a></p></div>
               <div><a class="maxbutton-8" href="https://y">Orphan</a></div>"#,
        );
        let buttons = doc.find_all("a");
        assert_eq!(WALK.heading_before(buttons[0]).as_deref(), Some("2160p"));
        assert_eq!(WALK.heading_before(buttons[1]), None);
    }
}
