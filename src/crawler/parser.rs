//! HTML parser for extracting listing links
//!
//! Parsing goes through html5ever (via `scraper`), which recovers from
//! unclosed tags and other broken markup the way a browser would, so this
//! module never fails: bad input simply yields fewer links.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Schemes that never point at a downloadable resource
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Extracts every anchor link from a page as absolute URLs
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document, in document order
/// - Relative, `../` and protocol-relative (`//host/path`) hrefs, resolved
///   against `page_url`
///
/// **Exclude:**
/// - Empty and fragment-only (`#...`) hrefs
/// - `javascript:`, `mailto:`, `tel:` and `data:` hrefs
/// - Anything that does not resolve to an HTTP(S) URL
///
/// Fragments are stripped from the resolved URLs, and a URL linked several
/// times (icon and name columns of a fancy index) is kept once, at its first
/// position.
///
/// # Example
///
/// ```
/// use sumi_sieve::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<pre><a href="../">Parent</a> <a href="sst.nc">sst.nc</a> <a href="2024/">2024/</a></pre>"#;
/// let page = Url::parse("https://example.com/pub/data/").unwrap();
/// assert_eq!(
///     extract_links(html, &page),
///     vec![
///         "https://example.com/pub/",
///         "https://example.com/pub/data/sst.nc",
///         "https://example.com/pub/data/2024/",
///     ]
/// );
/// ```
pub fn extract_links(content: &str, page_url: &Url) -> Vec<String> {
    let mut links = Vec::new();
    if content.trim().is_empty() {
        return links;
    }

    let document = Html::parse_document(content);
    let mut seen = HashSet::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, page_url) {
                    if seen.insert(absolute_url.clone()) {
                        links.push(absolute_url);
                    }
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, page_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute_url = page_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    absolute_url.set_fragment(None);
    Some(absolute_url.to_string())
}
