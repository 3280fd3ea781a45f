//! Splits a page's links into sub-directories and candidate files
//!
//! The trailing `/` on a link's path is the only signal used. No request is
//! made to confirm that a link really is a directory.

use url::Url;

/// Links of one listing page, partitioned by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Links whose path ends in `/`, in document order
    pub sub_dirs: Vec<String>,

    /// Every other link, in document order
    pub candidates: Vec<String>,
}

impl Listing {
    /// Total number of links in both buckets
    pub fn len(&self) -> usize {
        self.sub_dirs.len() + self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returns true if the link's path ends with the path separator
///
/// Query and fragment are ignored, so `https://h/pub/?C=M;O=A` is a
/// directory link while `https://h/get?dir=/` is not.
pub fn is_subdirectory(link: &str) -> bool {
    match Url::parse(link) {
        Ok(url) => url.path().ends_with('/'),
        Err(_) => link
            .split(['?', '#'])
            .next()
            .is_some_and(|path| path.ends_with('/')),
    }
}

/// Partitions links into sub-directories and candidate files
///
/// Every input link lands in exactly one bucket and relative order is kept
/// within each bucket.
pub fn classify<I, S>(links: I) -> Listing
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut listing = Listing::default();
    for link in links {
        let link = link.into();
        if is_subdirectory(&link) {
            listing.sub_dirs.push(link);
        } else {
            listing.candidates.push(link);
        }
    }
    listing
}
