//! Listing page parser
//!
//! Reads one listing page: locates entry nodes, pulls the title and detail
//! href out of each, drops boilerplate entries, and reports whether a
//! "next page" affordance is present.

use scraper::ElementRef;
use tracing::debug;

use super::config::ListingSelectors;
use super::markup::{Document, attr, contains_any_marker, find_first, text_of};
use crate::domain::RawListingItem;

/// Outcome of scanning one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScan {
    /// Entry nodes matched by the structural locator, before any filtering
    pub candidates: usize,

    /// Surviving items in document order
    pub items: Vec<RawListingItem>,

    pub has_next: bool,
}

/// Parser for one listing layout
#[derive(Debug, Clone, Copy)]
pub struct ListingParser {
    selectors: ListingSelectors,
    noise_markers: &'static [&'static str],
}

impl ListingParser {
    pub const fn new(selectors: ListingSelectors, noise_markers: &'static [&'static str]) -> Self {
        Self {
            selectors,
            noise_markers,
        }
    }

    pub fn scan(&self, body: &str) -> PageScan {
        let document = Document::parse(body);
        self.scan_document(&document)
    }

    pub fn scan_document(&self, document: &Document) -> PageScan {
        let entries = document.find_all(self.selectors.entry);
        debug!(
            "Found {} entry nodes with '{}' selector",
            entries.len(),
            self.selectors.entry
        );

        let items = entries
            .iter()
            .filter_map(|entry| self.extract_item(*entry))
            .collect();

        let has_next = self
            .selectors
            .next_page
            .is_some_and(|css| document.exists(css));

        PageScan {
            candidates: entries.len(),
            items,
            has_next,
        }
    }

    /// Title and href of one entry; `None` when either is missing or the title is noise
    fn extract_item(&self, entry: ElementRef<'_>) -> Option<RawListingItem> {
        let title_node = find_first(entry, self.selectors.title)?;
        let link_node = match self.selectors.link {
            Some(css) => find_first(entry, css)?,
            None => title_node,
        };

        let href = attr(link_node, "href")?.trim();
        let title = text_of(title_node);
        if title.is_empty() || href.is_empty() {
            return None;
        }

        if contains_any_marker(&title, self.noise_markers) {
            debug!("Skipping boilerplate entry: {}", title);
            return None;
        }

        Some(RawListingItem::new(title, href))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::parsing::config::DEFAULT_NOISE_MARKERS;

    const SELECTORS: ListingSelectors = ListingSelectors::anchored("ul.recent-movies li", "figcaption p")
        .with_link("figure a[href]")
        .with_next_page("div.pagination-wrap a.next.page-numbers");

    fn page(items: &str, next: bool) -> String {
        let pagination = if next {
            r#"<div class="pagination-wrap"><a class="next page-numbers" href="/page/2/">Next</a></div>"#
        } else {
            r#"<div class="pagination-wrap"><span class="current">1</span></div>"#
        };
        format!(r#"<html><body><ul class="recent-movies">{items}</ul>{pagination}</body></html>"#)
    }

    fn item(title: &str, href: &str) -> String {
        format!(r#"<li><figure><a href="{href}"><img/></a><figcaption><p>{title}</p></figcaption></figure></li>"#)
    }

    #[test]
    fn extracts_titles_and_links_in_document_order() {
        let body = page(&(item(" Movie One ", "/one/") + &item("Movie Two", "https://x/two/")), true);
        let scan = ListingParser::new(SELECTORS, DEFAULT_NOISE_MARKERS).scan(&body);

        assert_eq!(scan.candidates, 2);
        assert_eq!(
            scan.items,
            vec![
                RawListingItem::new("Movie One", "/one/"),
                RawListingItem::new("Movie Two", "https://x/two/"),
            ]
        );
        assert!(scan.has_next);
    }

    #[test]
    fn drops_noise_and_incomplete_entries() {
        let items = item("© 2025 HDHub. All Rights Reserved", "/footer/")
            + &item("Keep Me", "/keep/")
            + "<li><figcaption><p>No link</p></figcaption></li>"
            + &item("Also ALL RIGHTS RESERVED", "/x/");
        let scan = ListingParser::new(SELECTORS, DEFAULT_NOISE_MARKERS).scan(&page(&items, false));

        assert_eq!(scan.candidates, 4);
        assert_eq!(scan.items, vec![RawListingItem::new("Keep Me", "/keep/")]);
        assert!(!scan.has_next);
    }

    #[test]
    fn title_anchor_can_carry_the_link() {
        let selectors = ListingSelectors::anchored("article.latestPost.excerpt", "h2.title.front-view-title a");
        let body = r#"<article class="latestPost excerpt"><h2 class="title front-view-title"><a href="/m/">Film</a></h2></article>"#;
        let scan = ListingParser::new(selectors, DEFAULT_NOISE_MARKERS).scan(body);
        assert_eq!(scan.items, vec![RawListingItem::new("Film", "/m/")]);
        assert!(!scan.has_next);
    }
}
