//! Parsing context for listing pages

use crate::domain::{BrowseMode, SiteKey};

/// Where a listing page sits inside one enumeration call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContext {
    pub site: SiteKey,

    /// 1-based page index
    pub page: u32,

    pub mode: BrowseMode,
}

impl ParseContext {
    pub const fn new(site: SiteKey, page: u32, mode: BrowseMode) -> Self {
        Self { site, page, mode }
    }

    /// Deterministic diagnostic name for this page
    pub fn dump_name(&self) -> String {
        format!("{}_{}_page_{}", self.site, self.mode.as_str(), self.page)
    }
}
