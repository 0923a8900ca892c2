//! Movie service - the only surface the conversation layer talks to
//!
//! Wraps the site registry: every call resolves the site against the current
//! domain table and runs with a fresh HTTP session.

use std::sync::Arc;
use tracing::info;

use crate::domain::{Listing, SiteKey};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::diagnostics::{DiagnosticSink, FileDiagnostics, NoopDiagnostics};
use crate::infrastructure::http_client::HttpClientFactory;
use crate::infrastructure::site_domains::{DomainError, SiteDomainTable};
use crate::infrastructure::sites::{ScrapeTiming, SiteRegistry};

#[derive(Clone)]
pub struct MovieService {
    registry: SiteRegistry,
    max_pages: u32,
}

impl MovieService {
    pub const fn new(registry: SiteRegistry, max_pages: u32) -> Self {
        Self { registry, max_pages }
    }

    /// Wire the production collaborators from configuration
    pub fn from_config(config: &AppConfig) -> Self {
        let domains = Arc::new(SiteDomainTable::load(&config.sites.domain_file));
        let fetchers = Arc::new(HttpClientFactory::new(config.scraping.http.clone()));
        let diagnostics: Arc<dyn DiagnosticSink> = if config.diagnostics.enabled {
            Arc::new(FileDiagnostics::new(&config.diagnostics.directory))
        } else {
            Arc::new(NoopDiagnostics)
        };
        let timing = ScrapeTiming {
            request_timeout: config.scraping.http.timeout(),
            page_delay: config.scraping.page_delay(),
        };

        Self::new(SiteRegistry::new(domains, fetchers, diagnostics, timing), config.bot.max_pages)
    }

    /// Latest titles, or search results when `search` is given
    pub async fn list_movies(&self, site: SiteKey, search: Option<&str>) -> Listing {
        info!("🔎 Listing {} (search: {:?})", site, search);
        self.registry.site(site).enumerate(search, self.max_pages).await
    }

    /// Display lines for every download option of one detail page
    pub async fn download_links(&self, site: SiteKey, detail_url: &str) -> Vec<String> {
        info!("🔗 Extracting {} links from {}", site, detail_url);
        self.registry
            .site(site)
            .extract_links(detail_url)
            .await
            .into_iter()
            .map(|entry| entry.line)
            .collect()
    }

    pub fn update_domain(&self, site: SiteKey, raw: &str) -> Result<String, DomainError> {
        self.registry.domains().update(site, raw)
    }

    pub fn current_domain(&self, site: SiteKey) -> String {
        self.registry.domains().get(site)
    }
}
