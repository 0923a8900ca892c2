//! Shared enumeration loop and per-call scrape context
//!
//! Every site variant describes its listing layout as a [`ListingPlan`]; the
//! paging loop, inter-page delay, failure handling and diagnostics live here
//! once.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::domain::{BrowseMode, DownloadEntry, FetchResult, FetcherFactory, Listing, PageFetcher, SiteKey};
use crate::infrastructure::diagnostics::DiagnosticSink;
use crate::infrastructure::parsing::{Document, FeaturedSelectors, ListingParser, PageScan, ParseContext};

/// Timeouts and pacing applied to every request of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeTiming {
    pub request_timeout: Duration,
    /// Pause before every listing fetch after the first
    pub page_delay: Duration,
}

impl Default for ScrapeTiming {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            page_delay: Duration::from_secs(3),
        }
    }
}

/// Per-call view of one site: the domain snapshot plus its collaborators
#[derive(Clone)]
pub struct ScrapeContext {
    site: SiteKey,
    domain: String,
    fetchers: Arc<dyn FetcherFactory>,
    diagnostics: Arc<dyn DiagnosticSink>,
    timing: ScrapeTiming,
}

impl std::fmt::Debug for ScrapeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeContext")
            .field("site", &self.site)
            .field("domain", &self.domain)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl ScrapeContext {
    pub fn new(
        site: SiteKey,
        domain: impl Into<String>,
        fetchers: Arc<dyn FetcherFactory>,
        diagnostics: Arc<dyn DiagnosticSink>,
        timing: ScrapeTiming,
    ) -> Self {
        Self {
            site,
            domain: domain.into(),
            fetchers,
            diagnostics,
            timing,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn base_url(&self) -> String {
        format!("https://{}/", self.domain)
    }

    /// Absolute form of an href found on this site
    pub fn resolve(&self, href: &str) -> String {
        Url::parse(&self.base_url())
            .and_then(|base| base.join(href))
            .map(String::from)
            .unwrap_or_else(|_| href.to_string())
    }

    /// Fresh fetch session for this call; `None` (logged) when it cannot be built
    pub fn open_session(&self) -> Option<Box<dyn PageFetcher>> {
        match self.fetchers.session(self.site.client_profile()) {
            Ok(session) => Some(session),
            Err(e) => {
                error!("❌ Failed to open {} session: {}", self.site, e);
                None
            }
        }
    }

    /// GET through `fetcher`; failures are logged and become `None`
    pub async fn fetch(&self, fetcher: &dyn PageFetcher, url: &str) -> Option<FetchResult> {
        match fetcher.get(url, self.timing.request_timeout).await {
            Ok(response) => {
                debug!("Status code: {} for {}", response.status, url);
                Some(response)
            }
            Err(e) => {
                error!("❌ Error fetching {}: {}", url, e);
                None
            }
        }
    }

    /// Dump `body` as `{site}_{context}`
    pub async fn dump(&self, context: &str, body: &str) {
        self.diagnostics.dump(&format!("{}_{}", self.site, context), body).await;
    }

    /// Fetch one detail page and parse it; empty (and dumped) when nothing is found
    pub async fn extract_single_hop(&self, detail_url: &str, parse: fn(&str) -> Vec<DownloadEntry>) -> Vec<DownloadEntry> {
        let Some(fetcher) = self.open_session() else {
            return Vec::new();
        };

        let url = self.resolve(detail_url);
        info!("🎬 Fetching {} movie page: {}", self.site, url);
        let Some(page) = self.fetch(fetcher.as_ref(), &url).await else {
            return Vec::new();
        };

        let links = parse(&page.body);
        if links.is_empty() {
            warn!("No download links found on {}", url);
            self.dump("movie_page", &page.body).await;
        } else {
            info!("✅ Found {} download links on {}", links.len(), url);
        }
        links
    }

    /// Walk listing pages `1..=max_pages` and number everything found.
    ///
    /// A fetch failure ends the walk and keeps what was collected. A page
    /// with no entry nodes is dumped; in search mode it also ends the walk.
    /// In search mode a page without a next-page affordance is the last one.
    pub async fn enumerate(&self, plan: &ListingPlan, max_pages: u32) -> Listing {
        let Some(fetcher) = self.open_session() else {
            return Listing::default();
        };

        let mut featured = Vec::new();
        let mut items = Vec::new();

        for page in 1..=max_pages.max(1) {
            if page > 1 && !self.timing.page_delay.is_zero() {
                sleep(self.timing.page_delay).await;
            }

            let url = plan.page_url(page);
            info!("📄 Fetching {} {} page {}: {}", self.site, plan.mode.as_str(), page, url);

            let Some(response) = self.fetch(fetcher.as_ref(), &url).await else {
                break;
            };

            let (scan, featured_scan) = plan.scan(page, &response.body);

            if let Some(featured_scan) = featured_scan {
                if featured_scan.candidates == 0 {
                    warn!("No featured entries found on {}", url);
                    self.dump("featured", &response.body).await;
                }
                featured = featured_scan.items;
            }

            if scan.candidates == 0 {
                warn!("No movie entries found on {} page {}", self.site, page);
                let context = ParseContext::new(self.site, page, plan.mode);
                self.diagnostics.dump(&context.dump_name(), &response.body).await;
                match plan.mode {
                    BrowseMode::Search => break,
                    BrowseMode::Latest => continue,
                }
            }

            debug!("Page {} yielded {} of {} entries", page, scan.items.len(), scan.candidates);
            items.extend(scan.items);

            if plan.mode == BrowseMode::Search && !scan.has_next {
                debug!("No next page found.");
                break;
            }
        }

        let listing = Listing::from_items(featured.into_iter().chain(items));
        info!("✅ {} listing complete: {} titles", self.site, listing.len());
        listing
    }
}

/// How one enumeration call reads a site
pub struct ListingPlan {
    pub mode: BrowseMode,
    parser: ListingParser,
    featured: Option<(ListingParser, usize)>,
    page_url: Box<dyn Fn(u32) -> String + Send + Sync>,
}

impl ListingPlan {
    pub fn new(
        mode: BrowseMode,
        parser: ListingParser,
        page_url: impl Fn(u32) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            mode,
            parser,
            featured: None,
            page_url: Box::new(page_url),
        }
    }

    /// Read a capped featured block from page 1, emitted ahead of everything else
    pub fn with_featured(mut self, featured: FeaturedSelectors, noise_markers: &'static [&'static str]) -> Self {
        self.featured = Some((ListingParser::new(featured.selectors, noise_markers), featured.limit));
        self
    }

    pub fn page_url(&self, page: u32) -> String {
        (self.page_url)(page)
    }

    /// Main scan plus, on page 1, the featured scan
    fn scan(&self, page: u32, body: &str) -> (PageScan, Option<PageScan>) {
        let document = Document::parse(body);
        let main = self.parser.scan_document(&document);
        let featured = self.featured.as_ref().filter(|_| page == 1).map(|(parser, limit)| {
            let mut scan = parser.scan_document(&document);
            scan.items.truncate(*limit);
            scan
        });
        (main, featured)
    }
}

/// `https://{domain}/{section}` for page 1, `https://{domain}/{section}page/{n}/` after,
/// each followed by `?s={query}` when searching. `section` is empty or ends in `/`.
pub fn paged_url(domain: &str, section: &str, page: u32, query: Option<&str>) -> String {
    let path = if page <= 1 {
        format!("https://{domain}/{section}")
    } else {
        format!("https://{domain}/{section}page/{page}/")
    };
    match query {
        Some(q) => format!("{path}?s={q}"),
        None => path,
    }
}

/// Lowercase and form-encode a search term (spaces become `+`)
pub fn encode_query(term: &str) -> String {
    url::form_urlencoded::byte_serialize(term.trim().to_lowercase().as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_lowercased_and_form_encoded() {
        assert_eq!(encode_query("The Dark Knight"), "the+dark+knight");
        assert_eq!(encode_query("Fast & Furious"), "fast+%26+furious");
    }

    #[test]
    fn paged_urls_keep_the_query_on_later_pages() {
        assert_eq!(paged_url("a.b", "", 1, None), "https://a.b/");
        assert_eq!(paged_url("a.b", "", 2, Some("x+y")), "https://a.b/page/2/?s=x+y");
        assert_eq!(paged_url("a.b", "movies/", 1, None), "https://a.b/movies/");
        assert_eq!(paged_url("a.b", "movies/", 3, None), "https://a.b/movies/page/3/");
    }

    #[test]
    fn plan_builds_page_urls() {
        let plan = ListingPlan::new(
            BrowseMode::Latest,
            ListingParser::new(
                crate::infrastructure::parsing::ListingSelectors::anchored("li", "a"),
                &[],
            ),
            |page| format!("https://x/page/{page}/"),
        );
        assert_eq!(plan.page_url(3), "https://x/page/3/");
    }
}
