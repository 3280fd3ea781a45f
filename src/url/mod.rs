//! URL handling module for Sumi-Sieve
//!
//! This module provides URL normalization for the visited set, confinement of
//! the crawl to the base directory tree, and rebasing of output links.

mod normalize;
mod rebase;
mod scope;

// Re-export main functions
pub use normalize::normalize_url;
pub use rebase::{rebase_links, Rebase};
pub use scope::{is_within, scope_root};

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses and checks a user-supplied base URL
///
/// The base URL must be absolute with an HTTP(S) scheme and a host. Query and
/// fragment are preserved so the first request goes exactly where the user
/// pointed.
///
/// # Examples
///
/// ```
/// use sumi_sieve::url::parse_base_url;
///
/// let base = parse_base_url("https://www.ncei.noaa.gov/pub/data/").unwrap();
/// assert_eq!(base.path(), "/pub/data/");
/// assert!(parse_base_url("www.ncei.noaa.gov/pub/").is_err());
/// ```
pub fn parse_base_url(input: &str) -> UrlResult<Url> {
    let url = Url::parse(input.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", input, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "base URL must start with http:// or https://, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}
