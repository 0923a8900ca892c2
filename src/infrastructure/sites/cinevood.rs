//! Cinevood: browser client, four-tier extraction chain
//!
//! Detail pages come in several markup idioms. Tiers are tried in order and
//! the first one that yields links wins:
//! 1. `div.download-btns` groups (heading + anchors)
//! 2. `h6` headings inside `center`, walking forward over button siblings
//! 3. every `h6` in the document, same walk
//! 4. every button, walking backward to its nearest `h6`

use async_trait::async_trait;

use super::engine::{ListingPlan, ScrapeContext, encode_query, paged_url};
use crate::domain::{BrowseMode, DownloadEntry, Listing, MovieSite, RawDownload, SiteKey};
use crate::infrastructure::parsing::markup::{attr, contains_any_marker, find_all, find_first, text_of};
use crate::infrastructure::parsing::{
    DEFAULT_NOISE_MARKERS, Document, LinkStyle, ListingParser, ListingSelectors, SiblingWalk, Strategy,
    number_downloads, run_chain,
};

const LISTING: ListingSelectors =
    ListingSelectors::anchored("article.latestPost.excerpt", "h2.title.front-view-title a")
        .with_next_page("div.pagination a.next");

/// Heading markers for the container tiers
const PRIMARY_BLOCKED: &[&str] = &["download", "trailer"];

/// Heading markers for the document-wide tiers
const FALLBACK_BLOCKED: &[&str] = &["watch online", "trailer"];

/// Link captions that are never downloads
const LINK_BLOCKED: &[&str] = &["watch online", "trailer"];

const UNKNOWN_QUALITY: &str = "Unknown Quality";

const WALK: SiblingWalk = SiblingWalk {
    heading_tag: "h6",
    button_classes: &["maxbutton-8", "maxbutton-9"],
    caption: "span.mb-text",
    default_caption: "Download",
    caption_blocklist: LINK_BLOCKED,
};

const STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "download button groups",
        run: download_button_groups,
    },
    Strategy {
        name: "centered heading walk",
        run: centered_heading_walk,
    },
    Strategy {
        name: "global heading walk",
        run: global_heading_walk,
    },
    Strategy {
        name: "button backward walk",
        run: button_backward_walk,
    },
];

fn download_button_groups(document: &Document) -> Vec<RawDownload> {
    let mut found = Vec::new();
    for group in document.find_all("div.download-btns") {
        let Some(heading) = find_first(group, "h6") else {
            continue;
        };
        let anchors = find_all(group, "a[href]");
        if anchors.is_empty() {
            continue;
        }

        let description = text_of(heading);
        if contains_any_marker(&description, PRIMARY_BLOCKED) {
            continue;
        }

        for anchor in anchors {
            let Some(url) = attr(anchor, "href").map(str::trim).filter(|u| !u.is_empty()) else {
                continue;
            };
            let text = text_of(anchor);
            let label = if text.is_empty() {
                find_first(anchor, WALK.caption)
                    .map(text_of)
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| WALK.default_caption.to_string())
            } else {
                text
            };
            if contains_any_marker(&label, LINK_BLOCKED) {
                continue;
            }
            found.push(RawDownload::new(description.clone(), Some(label), url));
        }
    }
    found
}

fn centered_heading_walk(document: &Document) -> Vec<RawDownload> {
    let mut found = Vec::new();
    for center in document.find_all("center") {
        for heading in find_all(center, WALK.heading_tag) {
            let description = text_of(heading);
            if contains_any_marker(&description, PRIMARY_BLOCKED) {
                continue;
            }
            found.extend(WALK.collect_after(heading, &description));
        }
    }
    found
}

fn global_heading_walk(document: &Document) -> Vec<RawDownload> {
    let mut found = Vec::new();
    for heading in document.find_all(WALK.heading_tag) {
        let description = text_of(heading);
        if contains_any_marker(&description, FALLBACK_BLOCKED) {
            continue;
        }
        found.extend(WALK.collect_after(heading, &description));
    }
    found
}

fn button_backward_walk(document: &Document) -> Vec<RawDownload> {
    document
        .find_all("a.maxbutton-8, a.maxbutton-9")
        .into_iter()
        .filter_map(|anchor| {
            let description = WALK
                .heading_before(anchor)
                .unwrap_or_else(|| UNKNOWN_QUALITY.to_string());
            if contains_any_marker(&description, FALLBACK_BLOCKED) {
                return None;
            }
            WALK.button(&description, anchor)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Cinevood {
    ctx: ScrapeContext,
}

impl Cinevood {
    pub const fn new(ctx: ScrapeContext) -> Self {
        Self { ctx }
    }

    pub fn listing_plan(&self, search: Option<&str>) -> ListingPlan {
        let domain = self.ctx.domain().to_string();
        let query = search.map(encode_query);
        let mode = if query.is_some() { BrowseMode::Search } else { BrowseMode::Latest };
        ListingPlan::new(mode, ListingParser::new(LISTING, DEFAULT_NOISE_MARKERS), move |page| {
            paged_url(&domain, "", page, query.as_deref())
        })
    }

    /// Numbered download lines of one detail page
    pub fn parse_downloads(body: &str) -> Vec<DownloadEntry> {
        let document = Document::parse(body);
        number_downloads(run_chain(&document, STRATEGIES), LinkStyle::Bracketed)
    }
}

#[async_trait]
impl MovieSite for Cinevood {
    fn key(&self) -> SiteKey {
        SiteKey::Cinevood
    }

    async fn enumerate(&self, search: Option<&str>, max_pages: u32) -> Listing {
        let plan = self.listing_plan(search);
        self.ctx.enumerate(&plan, max_pages).await
    }

    async fn extract_links(&self, detail_url: &str) -> Vec<DownloadEntry> {
        self.ctx.extract_single_hop(detail_url, Self::parse_downloads).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(body: &str) -> Vec<String> {
        Cinevood::parse_downloads(body).into_iter().map(|e| e.line).collect()
    }

    #[test]
    fn button_groups_use_heading_and_anchor_text() {
        let body = r#"<div class="download-btns"><h6>1080p BluRay</h6>
                <a href="https://d/1">Part 1</a><a href="https://d/2">Part 2</a></div>
            <div class="download-btns"><h6>Download Trailer</h6><a href="https://d/t">Get</a></div>"#;
        assert_eq!(
            lines(body),
            vec!["1. 1080p BluRay [Part 1]: https://d/1", "2. 1080p BluRay [Part 2]: https://d/2"]
        );
    }

    #[test]
    fn first_productive_tier_wins() {
        let body = r#"<div class="download-btns"><h6>720p</h6><a href="https://tier1">G-Drive</a></div>
            <center><h6>1080p</h6><a class="maxbutton-8" href="https://tier2"><span class="mb-text">Fast</span></a></center>"#;
        assert_eq!(lines(body), vec!["1. 720p [G-Drive]: https://tier1"]);
    }

    #[test]
    fn centered_walk_skips_download_headings_but_stops_at_them() {
        let body = r#"<center>
            <h6>480p WEB-DL</h6>
            <a class="maxbutton-9" href="https://a"><span class="mb-text">Link A</span></a>
            <h6>Download Now</h6>
            <a class="maxbutton-9" href="https://b"></a>
        </center>"#;
        assert_eq!(lines(body), vec!["1. 480p WEB-DL [Link A]: https://a"]);
    }

    #[test]
    fn global_walk_runs_outside_center() {
        let body = r#"<div class="entry">
            <h6>Download 2160p</h6>
            <p><a class="maxbutton-8" href="https://u"><span class="mb-text">Ultra</span></a></p>
        </div>"#;
        assert_eq!(lines(body), vec!["1. Download 2160p [Ultra]: https://u"]);
    }

    #[test]
    fn last_resort_labels_orphan_buttons() {
        let body = r#"<div><h6>Watch Online</h6></div>
            <div><span><a class="maxbutton-8" href="https://x"></a></span></div>
            <div><a class="maxbutton-9" href="https://y"><span class="mb-text">Mirror</span></a></div>
            <div><a class="maxbutton-9" href="https://z"><span class="mb-text">Trailer</span></a></div>"#;
        assert_eq!(
            lines(body),
            vec!["1. Unknown Quality [Download]: https://x", "2. Unknown Quality [Mirror]: https://y"]
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let body = r#"<center><h6>1080p</h6><a class="maxbutton-8" href="https://x">x</a></center>"#;
        assert_eq!(lines(body), lines(body));
        assert_eq!(lines(body).len(), 1);
    }
}
