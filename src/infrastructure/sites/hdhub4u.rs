//! HDHub4u: plain client, one extraction strategy
//!
//! Download anchors sit directly under `h3`/`h4` headings on the detail page.
//! Labels are escaped for Telegram MarkdownV2.

use async_trait::async_trait;

use super::engine::{ListingPlan, ScrapeContext, encode_query, paged_url};
use crate::domain::{BrowseMode, DownloadEntry, Listing, MovieSite, RawDownload, SiteKey};
use crate::infrastructure::parsing::markup::{attr, contains_any_marker, find_first, text_of};
use crate::infrastructure::parsing::{
    DEFAULT_NOISE_MARKERS, Document, LinkStyle, ListingParser, ListingSelectors, Strategy, escape_markdown_v2,
    number_downloads, run_chain,
};

const LISTING: ListingSelectors = ListingSelectors::anchored("ul.recent-movies li", "figcaption p")
    .with_link("figure a[href]")
    .with_next_page("div.pagination-wrap a.next.page-numbers");

const BLOCKED_LABELS: &[&str] = &["trailer", "watch online", "player"];

const STRATEGIES: &[Strategy] = &[Strategy {
    name: "heading anchors",
    run: heading_anchors,
}];

fn heading_anchors(document: &Document) -> Vec<RawDownload> {
    document
        .find_all("h3 a[href], h4 a[href]")
        .into_iter()
        .filter_map(|anchor| {
            let text = find_first(anchor, "em").map_or_else(|| text_of(anchor), text_of);
            let label = escape_markdown_v2(&text);
            let url = attr(anchor, "href")?.trim();
            if label.is_empty() || url.is_empty() || contains_any_marker(&label, BLOCKED_LABELS) {
                return None;
            }
            Some(RawDownload::new(label, None, url))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Hdhub4u {
    ctx: ScrapeContext,
}

impl Hdhub4u {
    pub const fn new(ctx: ScrapeContext) -> Self {
        Self { ctx }
    }

    pub fn listing_plan(&self, search: Option<&str>) -> ListingPlan {
        let domain = self.ctx.domain().to_string();
        let query = search.map(encode_query);
        let mode = if query.is_some() { BrowseMode::Search } else { BrowseMode::Latest };
        ListingPlan::new(mode, ListingParser::new(LISTING, DEFAULT_NOISE_MARKERS), move |page| {
            paged_url(&domain, "", page, query.as_deref())
        })
    }

    /// Numbered download lines of one detail page
    pub fn parse_downloads(body: &str) -> Vec<DownloadEntry> {
        let document = Document::parse(body);
        number_downloads(run_chain(&document, STRATEGIES), LinkStyle::BoldDotParen)
    }
}

#[async_trait]
impl MovieSite for Hdhub4u {
    fn key(&self) -> SiteKey {
        SiteKey::Hdhub4u
    }

    async fn enumerate(&self, search: Option<&str>, max_pages: u32) -> Listing {
        let plan = self.listing_plan(search);
        self.ctx.enumerate(&plan, max_pages).await
    }

    async fn extract_links(&self, detail_url: &str) -> Vec<DownloadEntry> {
        self.ctx.extract_single_hop(detail_url, Self::parse_downloads).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str = r#"<html><body><div class="page-body">
        <h3><a href="https://hubdrive.example/1"><em>480p [400MB]</em></a></h3>
        <h3><a href="https://trailer.example">Watch Trailer</a></h3>
        <h4><a href="https://hubdrive.example/2">1080p x264</a></h4>
        <h4><a href="https://player.example">HD Player</a></h4>
        <h2><a href="https://ignored.example">Not a heading we read</a></h2>
    </div></body></html>"#;

    #[test]
    fn extracts_heading_anchors_with_dense_ordinals() {
        let links = Hdhub4u::parse_downloads(DETAIL);
        let lines: Vec<_> = links.iter().map(|l| l.line.as_str()).collect();
        assert_eq!(
            lines,
            vec![
                "1.) **480p \\[400MB\\]** : https://hubdrive.example/1\n\n",
                "2.) **1080p x264** : https://hubdrive.example/2\n\n",
            ]
        );
    }

    #[test]
    fn page_without_headings_yields_nothing() {
        assert!(Hdhub4u::parse_downloads("<p><a href='x'>x</a></p>").is_empty());
    }
}
