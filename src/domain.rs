//! Domain module - Core scraping entities and service contracts
//!
//! This module contains the entities produced by the listing enumerator and
//! the download-link extractor, the site identifiers, and the traits the
//! infrastructure layer implements.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod entities;
pub mod services;
pub mod site;

// Re-export commonly used items for convenience
pub use entities::{DownloadEntry, FetchResult, Listing, ListingEntry, RawDownload, RawListingItem};
pub use services::{FetcherFactory, MovieSite, PageFetcher};
pub use site::{BrowseMode, ClientProfile, SiteKey, UnknownSiteKey};
