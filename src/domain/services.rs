//! Service contracts between the scraping core and its collaborators
//!
//! The infrastructure layer implements these traits; the application layer
//! and the tests only depend on them.

use async_trait::async_trait;
use std::time::Duration;

use super::entities::{DownloadEntry, FetchResult, Listing};
use super::site::{ClientProfile, SiteKey};
use crate::infrastructure::fetch_error::FetchError;

/// Single GET capability
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, failing on timeout, transport error, challenge page, or non-2xx status
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchResult, FetchError>;
}

/// Builds a fresh fetch session for one scrape call.
///
/// Sessions are never shared between calls so cookies and connections stay
/// scoped to the call that created them.
pub trait FetcherFactory: Send + Sync {
    fn session(&self, profile: ClientProfile) -> Result<Box<dyn PageFetcher>, FetchError>;
}

/// One movie site: listing enumeration plus download-link extraction.
#[async_trait]
pub trait MovieSite: Send + Sync {
    fn key(&self) -> SiteKey;

    /// Enumerate listing pages. Never fails; partial results are returned on error.
    async fn enumerate(&self, search: Option<&str>, max_pages: u32) -> Listing;

    /// Extract download options from one detail page. Empty on any failure.
    async fn extract_links(&self, detail_url: &str) -> Vec<DownloadEntry>;
}
