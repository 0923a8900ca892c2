//! Document query helpers over `scraper`
//!
//! Find-all / find-first by selector, trimmed text, attributes, and
//! element-only sibling traversal. Invalid selectors are logged and treated
//! as "no match" so a typo in one locator can never abort a scrape.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::error::{ParsingError, ParsingResult};

/// Compile one selector
pub fn compile(css: &str) -> ParsingResult<Selector> {
    Selector::parse(css).map_err(|e| ParsingError::invalid_selector(css, &e.to_string()))
}

/// Parsed HTML document
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    pub fn find_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match compile(css) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }

    pub fn find_first(&self, css: &str) -> Option<ElementRef<'_>> {
        self.find_all(css).into_iter().next()
    }

    pub fn exists(&self, css: &str) -> bool {
        self.find_first(css).is_some()
    }
}

/// All descendants of `scope` matching `css`, in document order
pub fn find_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match compile(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(e) => {
            warn!("{}", e);
            Vec::new()
        }
    }
}

pub fn find_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    find_all(scope, css).into_iter().next()
}

/// Concatenated, trimmed text content
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

pub fn is_tag(element: ElementRef<'_>, name: &str) -> bool {
    element.value().name().eq_ignore_ascii_case(name)
}

pub fn has_any_class(element: ElementRef<'_>, classes: &[&str]) -> bool {
    element.value().classes().any(|c| classes.contains(&c))
}

/// Following siblings that are elements; text and comment nodes are skipped
pub fn next_element_siblings<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.next_siblings().filter_map(ElementRef::wrap)
}

/// Preceding siblings that are elements, nearest first
pub fn prev_element_siblings<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.prev_siblings().filter_map(ElementRef::wrap)
}

pub fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    next_element_siblings(element).next()
}

pub fn prev_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    prev_element_siblings(element).next()
}

pub fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

/// Case-insensitive "contains any of" check used by every noise and exclusion filter
pub fn contains_any_marker(text: &str, markers: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    markers.iter().any(|m| lowered.contains(&m.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <html><body>
          <div id="box">
            <h6>First</h6>
            text node
            <!-- comment -->
            <p class="a b">Para <em>one</em></p>
            <h6>Second</h6>
          </div>
        </body></html>
    "#;

    #[test]
    fn finds_and_reads_text() {
        let doc = Document::parse(FIXTURE);
        let headings = doc.find_all("h6");
        assert_eq!(headings.len(), 2);
        assert_eq!(text_of(headings[0]), "First");
        assert!(doc.exists("p.a.b"));
        assert!(doc.find_first("table").is_none());
    }

    #[test]
    fn sibling_walk_skips_non_elements() {
        let doc = Document::parse(FIXTURE);
        let first = doc.find_first("h6").unwrap();
        let next = next_element_sibling(first).unwrap();
        assert!(is_tag(next, "p"));
        assert!(has_any_class(next, &["b"]));

        let second = doc.find_all("h6")[1];
        let prev = prev_element_sibling(second).unwrap();
        assert!(is_tag(prev, "p"));
        assert_eq!(prev_element_siblings(second).count(), 2);
    }

    #[test]
    fn invalid_selector_is_no_match() {
        let doc = Document::parse(FIXTURE);
        assert!(doc.find_all("div[[").is_empty());
        assert!(compile("div[[").is_err());
    }

    #[test]
    fn marker_matching_is_case_insensitive() {
        assert!(contains_any_marker("Official TRAILER", &["trailer"]));
        assert!(contains_any_marker("© 2024 Site", &["©", "all rights reserved"]));
        assert!(!contains_any_marker("1080p BluRay", &["trailer", "watch online"]));
    }
}
