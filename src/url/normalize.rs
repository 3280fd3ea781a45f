use crate::UrlError;
use url::Url;

/// Normalizes a URL into the key used to track visited listings
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an HTTP or HTTPS scheme
/// 3. Require a host (the parser lowercases it and drops default ports)
/// 4. Collapse repeated slashes in the path; dot segments are already resolved
/// 5. Remove the query string (autoindex sort links such as `?C=M;O=A`
///    point back at the same directory)
/// 6. Remove the fragment
///
/// The trailing slash is kept: it is what marks a directory.
///
/// # Examples
///
/// ```
/// use sumi_sieve::url::normalize_url;
///
/// let url = normalize_url("HTTP://Mirror.EXAMPLE.org:80/pub//data/?C=M;O=A").unwrap();
/// assert_eq!(url.as_str(), "http://mirror.example.org/pub/data/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    let collapsed = collapse_slashes(url.path());
    url.set_path(&collapsed);

    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Collapses runs of `/` into a single separator
fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;

    for c in path.chars() {
        if c == '/' {
            if !previous_slash {
                out.push(c);
            }
            previous_slash = true;
        } else {
            out.push(c);
            previous_slash = false;
        }
    }

    if out.is_empty() {
        out.push('/');
    }
    out
}
