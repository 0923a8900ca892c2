//! HDMovie2: browser client, featured block, one indirection hop
//!
//! The detail page only links to a separate download page on an external
//! host; links are read from that second page.

use async_trait::async_trait;
use tracing::{info, warn};

use super::engine::{ListingPlan, ScrapeContext, encode_query, paged_url};
use crate::domain::{BrowseMode, DownloadEntry, Listing, MovieSite, RawDownload, SiteKey};
use crate::infrastructure::parsing::markup::{attr, contains_any_marker, text_of};
use crate::infrastructure::parsing::{
    DEFAULT_NOISE_MARKERS, Document, FeaturedSelectors, LinkStyle, ListingParser, ListingSelectors, Strategy,
    number_downloads, run_chain,
};

const SEARCH: ListingSelectors = ListingSelectors::anchored("div.result-item", "div.details div.title a")
    .with_next_page("div.pagination a.inactive");

const ARCHIVE: ListingSelectors = ListingSelectors::anchored("div#archive-content article.item.movies", "div.data h3 a");

const FEATURED: FeaturedSelectors = FeaturedSelectors {
    selectors: ListingSelectors::anchored("div.items.featured article.item.movies", "div.data.dfeatur h3 a"),
    limit: 15,
};

/// Anchor on the detail page pointing at the download host
const DOWNLOAD_PAGE_LINK: &str = r#"div.wp-content p a[href*="dwo.hair"]"#;

const BLOCKED_LABELS: &[&str] = &["watch online", "trailer"];

const STRATEGIES: &[Strategy] = &[Strategy {
    name: "download links section",
    run: download_section,
}];

fn download_section(document: &Document) -> Vec<RawDownload> {
    document
        .find_all("div.download-links-section p a[href]")
        .into_iter()
        .filter_map(|anchor| {
            let label = text_of(anchor);
            let url = attr(anchor, "href")?.trim();
            if label.is_empty() || url.is_empty() || contains_any_marker(&label, BLOCKED_LABELS) {
                return None;
            }
            Some(RawDownload::new(label, None, url))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Hdmovie2 {
    ctx: ScrapeContext,
}

impl Hdmovie2 {
    pub const fn new(ctx: ScrapeContext) -> Self {
        Self { ctx }
    }

    pub fn listing_plan(&self, search: Option<&str>) -> ListingPlan {
        let domain = self.ctx.domain().to_string();
        match search.map(encode_query) {
            Some(query) => ListingPlan::new(
                BrowseMode::Search,
                ListingParser::new(SEARCH, DEFAULT_NOISE_MARKERS),
                move |page| paged_url(&domain, "", page, Some(query.as_str())),
            ),
            None => ListingPlan::new(
                BrowseMode::Latest,
                ListingParser::new(ARCHIVE, DEFAULT_NOISE_MARKERS),
                move |page| paged_url(&domain, "movies/", page, None),
            )
            .with_featured(FEATURED, DEFAULT_NOISE_MARKERS),
        }
    }

    /// First link to the external download page, if the detail page has one
    pub fn download_page_link(body: &str) -> Option<String> {
        let document = Document::parse(body);
        document
            .find_first(DOWNLOAD_PAGE_LINK)
            .and_then(|anchor| attr(anchor, "href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
    }

    /// Numbered download lines of the external download page
    pub fn parse_download_page(body: &str) -> Vec<DownloadEntry> {
        let document = Document::parse(body);
        number_downloads(run_chain(&document, STRATEGIES), LinkStyle::BoldParen)
    }
}

#[async_trait]
impl MovieSite for Hdmovie2 {
    fn key(&self) -> SiteKey {
        SiteKey::Hdmovie2
    }

    async fn enumerate(&self, search: Option<&str>, max_pages: u32) -> Listing {
        let plan = self.listing_plan(search);
        self.ctx.enumerate(&plan, max_pages).await
    }

    async fn extract_links(&self, detail_url: &str) -> Vec<DownloadEntry> {
        let Some(fetcher) = self.ctx.open_session() else {
            return Vec::new();
        };

        let url = self.ctx.resolve(detail_url);
        info!("🎬 Fetching hdmovie2 movie page: {}", url);
        let Some(detail) = self.ctx.fetch(fetcher.as_ref(), &url).await else {
            return Vec::new();
        };

        let Some(download_page) = Self::download_page_link(&detail.body) else {
            warn!("No download page link found on {}", url);
            self.ctx.dump("movie_page", &detail.body).await;
            return Vec::new();
        };

        let download_page = self.ctx.resolve(&download_page);
        info!("📥 Fetching download page: {}", download_page);
        let Some(page) = self.ctx.fetch(fetcher.as_ref(), &download_page).await else {
            return Vec::new();
        };

        let links = Self::parse_download_page(&page.body);
        if links.is_empty() {
            warn!("No download links found on {}", download_page);
            self.ctx.dump("download_page", &page.body).await;
        }
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_download_page_link() {
        let body = r#"<div class="wp-content">
            <p><a href="https://other.host/x">Other</a></p>
            <p><a href="https://dwo.hair/abc">Download</a></p>
            <p><a href="https://dwo.hair/def">Mirror</a></p>
        </div>"#;
        assert_eq!(Hdmovie2::download_page_link(body).as_deref(), Some("https://dwo.hair/abc"));
    }

    #[test]
    fn missing_download_page_link_is_none() {
        let body = r#"<div class="content"><p><a href="https://dwo.hair/abc">outside wp-content</a></p></div>"#;
        assert_eq!(Hdmovie2::download_page_link(body), None);
    }

    #[test]
    fn parses_download_page_and_drops_blocked_labels() {
        let body = r#"<div class="download-links-section">
            <p><a href="https://g.example/1">720p HEVC</a></p>
            <p><a href="https://g.example/2">Watch Online</a></p>
            <p><a href="https://g.example/3">1080p</a></p>
        </div>"#;
        let lines: Vec<_> = Hdmovie2::parse_download_page(body).into_iter().map(|e| e.line).collect();
        assert_eq!(
            lines,
            vec!["1) **720p HEVC** : https://g.example/1\n", "2) **1080p** : https://g.example/3\n"]
        );
    }
}
