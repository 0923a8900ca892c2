//! Conversation states

use serde::{Deserialize, Serialize};

use crate::domain::{BrowseMode, Listing, SiteKey};

/// Listing shown to one user, with the keyboard page they are on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSession {
    pub site: SiteKey,
    pub mode: BrowseMode,
    /// `"N. Title"` strings
    pub titles: Vec<String>,
    /// Detail hrefs, index-aligned with `titles`
    pub links: Vec<String>,
    /// 1-based keyboard page
    pub page: usize,
}

impl ListingSession {
    pub fn new(site: SiteKey, mode: BrowseMode, listing: Listing) -> Self {
        let (titles, links) = listing.into_parts();
        Self {
            site,
            mode,
            titles,
            links,
            page: 1,
        }
    }

    /// Detail href for a 1-based selection
    pub fn link(&self, selection: usize) -> Option<&str> {
        selection
            .checked_sub(1)
            .and_then(|index| self.links.get(index))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    #[default]
    Start,
    ModeSelection,
    SiteSelection(BrowseMode),
    MovieSearch(SiteKey),
    MovieSelection(ListingSession),
    DomainSiteSelection,
    DomainInput(SiteKey),
}
