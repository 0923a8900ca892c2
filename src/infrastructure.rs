//! Infrastructure layer: HTTP, parsing, site variants, and process plumbing
//!
//! Implements the domain service traits and hosts configuration, logging,
//! the site-domain table and the diagnostics sink.

pub mod config;
pub mod diagnostics;
pub mod fetch_error;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod site_domains;
pub mod sites;

// Re-export commonly used items
pub use config::AppConfig;
pub use diagnostics::{DiagnosticSink, FileDiagnostics, NoopDiagnostics};
pub use fetch_error::{FetchError, FetchOutcome};
pub use http_client::{HttpClient, HttpClientConfig, HttpClientFactory};
pub use logging::init_logging_with_config;
pub use site_domains::{DomainError, SiteDomainTable, normalize_domain};
pub use sites::{ScrapeContext, ScrapeTiming, SiteRegistry};
