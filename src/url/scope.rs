use url::Url;

/// Returns the directory tree a crawl rooted at `url` may enter
///
/// Listing URLs name directories, so a path without a trailing `/` gets one
/// appended rather than being cut back to its parent. Query and fragment are
/// always removed.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_sieve::url::scope_root;
///
/// let url = Url::parse("https://example.com/pub/data/?C=M;O=A").unwrap();
/// assert_eq!(scope_root(&url).as_str(), "https://example.com/pub/data/");
///
/// let url = Url::parse("https://example.com/pub/data").unwrap();
/// assert_eq!(scope_root(&url).as_str(), "https://example.com/pub/data/");
/// ```
pub fn scope_root(url: &Url) -> Url {
    let mut root = url.clone();
    root.set_query(None);
    root.set_fragment(None);

    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    root
}

/// Checks whether `link` lies inside the directory tree rooted at `base`
///
/// Both URLs must share scheme, host and port, and the link's path must
/// start with the path of [`scope_root`] of the base. Parent (`../`) and
/// sibling directories are outside, as are other hosts.
pub fn is_within(base: &Url, link: &Url) -> bool {
    let root = scope_root(base);

    root.scheme() == link.scheme()
        && root.host_str() == link.host_str()
        && root.port_or_known_default() == link.port_or_known_default()
        && link.path().starts_with(root.path())
}
