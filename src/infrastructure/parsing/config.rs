//! Locator tables for listing pages
//!
//! Each site describes its markup as data: a selector for entry nodes,
//! nested selectors for the title and detail link, and the pagination
//! affordance that signals another search page.

/// Selectors used to read one listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingSelectors {
    /// Candidate entry nodes
    pub entry: &'static str,

    /// Title text, relative to an entry
    pub title: &'static str,

    /// Anchor carrying the detail href, relative to an entry.
    /// `None` means the title node itself carries the href.
    pub link: Option<&'static str>,

    /// "Next page" affordance; absence stops a search after the current page
    pub next_page: Option<&'static str>,
}

impl ListingSelectors {
    /// Selectors for a site whose title anchor also carries the link
    pub const fn anchored(entry: &'static str, title: &'static str) -> Self {
        Self {
            entry,
            title,
            link: None,
            next_page: None,
        }
    }

    pub const fn with_link(mut self, link: &'static str) -> Self {
        self.link = Some(link);
        self
    }

    pub const fn with_next_page(mut self, next_page: &'static str) -> Self {
        self.next_page = Some(next_page);
        self
    }
}

/// Extra block some sites render above the first browse page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeaturedSelectors {
    pub selectors: ListingSelectors,

    /// Maximum featured entries kept, in document order
    pub limit: usize,
}

/// Title markers that identify footer/copyright boilerplate
pub const DEFAULT_NOISE_MARKERS: &[&str] = &["©", "all rights reserved"];
