//! HTML parsing for listing and detail pages
//!
//! Everything in here is synchronous and works on owned markup so callers
//! can parse between awaits without holding a document across them.

pub mod config;
pub mod context;
pub mod download_parser;
pub mod error;
pub mod listing_parser;
pub mod markup;

pub use config::{DEFAULT_NOISE_MARKERS, FeaturedSelectors, ListingSelectors};
pub use context::ParseContext;
pub use download_parser::{LinkStyle, SiblingWalk, Strategy, escape_markdown_v2, number_downloads, run_chain};
pub use error::{ParsingError, ParsingResult};
pub use listing_parser::{ListingParser, PageScan};
pub use markup::Document;
