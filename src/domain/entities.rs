//! Domain entities
//!
//! Transient values produced by one enumeration or extraction call. Nothing
//! here is persisted; ordinals always restart at 1 for every call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One title discovered on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// 1-based position across every page fetched by the call
    pub ordinal: usize,
    /// Trimmed display title
    pub title: String,
    /// Detail page href, absolute or site-relative, exactly as found
    pub detail_url: String,
}

impl ListingEntry {
    /// Title as shown to the user: `"{ordinal}. {title}"`
    pub fn display_title(&self) -> String {
        format!("{}. {}", self.ordinal, self.title)
    }
}

/// Title/link pair before numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListingItem {
    pub title: String,
    pub href: String,
}

impl RawListingItem {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }
}

/// Ordered result of one enumeration call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    entries: Vec<ListingEntry>,
}

impl Listing {
    /// Number raw items densely from 1, in the order given.
    pub fn from_items(items: impl IntoIterator<Item = RawListingItem>) -> Self {
        let entries = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| ListingEntry {
                ordinal: index + 1,
                title: item.title,
                detail_url: item.href,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `"N. Title"` strings, index-aligned with [`Listing::links`]
    pub fn titles(&self) -> Vec<String> {
        self.entries.iter().map(ListingEntry::display_title).collect()
    }

    pub fn links(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.detail_url.clone()).collect()
    }

    /// Split into the `(titles, links)` pair handed to the conversation layer
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        self.entries
            .into_iter()
            .map(|e| (format!("{}. {}", e.ordinal, e.title), e.detail_url))
            .unzip()
    }
}

/// Download option found by an extraction strategy, before numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDownload {
    /// Quality/description text (heading or anchor text)
    pub description: String,
    /// Link category tag, e.g. the button caption
    pub label: Option<String>,
    pub url: String,
}

impl RawDownload {
    pub fn new(description: impl Into<String>, label: Option<String>, url: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            label,
            url: url.into(),
        }
    }
}

/// One numbered download option, already rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEntry {
    /// 1-based position within one extraction call
    pub ordinal: usize,
    pub description: String,
    pub label: Option<String>,
    pub url: String,
    /// Site-specific rendering of this entry
    pub line: String,
}

impl fmt::Display for DownloadEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Response of a single GET, owned by the caller that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub status: u16,
    pub body: String,
    pub final_url: String,
}
