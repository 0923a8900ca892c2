//! Site variants and the registry that binds them to the current domains
//!
//! Each call through [`SiteRegistry::site`] snapshots the domain table, so a
//! domain update only affects calls that start after it.

pub mod cinevood;
pub mod engine;
pub mod hdhub4u;
pub mod hdmovie2;

use std::sync::Arc;

pub use cinevood::Cinevood;
pub use engine::{ListingPlan, ScrapeContext, ScrapeTiming, encode_query, paged_url};
pub use hdhub4u::Hdhub4u;
pub use hdmovie2::Hdmovie2;

use crate::domain::{FetcherFactory, MovieSite, SiteKey};
use crate::infrastructure::diagnostics::DiagnosticSink;
use crate::infrastructure::site_domains::SiteDomainTable;

/// Builds site handles for one call each
#[derive(Clone)]
pub struct SiteRegistry {
    domains: Arc<SiteDomainTable>,
    fetchers: Arc<dyn FetcherFactory>,
    diagnostics: Arc<dyn DiagnosticSink>,
    timing: ScrapeTiming,
}

impl SiteRegistry {
    pub fn new(
        domains: Arc<SiteDomainTable>,
        fetchers: Arc<dyn FetcherFactory>,
        diagnostics: Arc<dyn DiagnosticSink>,
        timing: ScrapeTiming,
    ) -> Self {
        Self {
            domains,
            fetchers,
            diagnostics,
            timing,
        }
    }

    pub const fn domains(&self) -> &Arc<SiteDomainTable> {
        &self.domains
    }

    /// Per-call context for `site` with the domain as of now
    pub fn context(&self, site: SiteKey) -> ScrapeContext {
        ScrapeContext::new(
            site,
            self.domains.get(site),
            Arc::clone(&self.fetchers),
            Arc::clone(&self.diagnostics),
            self.timing,
        )
    }

    pub fn site(&self, site: SiteKey) -> Box<dyn MovieSite> {
        let ctx = self.context(site);
        match site {
            SiteKey::Cinevood => Box::new(Cinevood::new(ctx)),
            SiteKey::Hdhub4u => Box::new(Hdhub4u::new(ctx)),
            SiteKey::Hdmovie2 => Box::new(Hdmovie2::new(ctx)),
        }
    }
}
