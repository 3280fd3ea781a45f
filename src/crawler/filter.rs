//! Regular-expression filter applied to candidate file links
//!
//! The pattern is searched for (not fully matched) in each resolved absolute
//! URL, so `\.nc$` keeps NetCDF files and `2024` keeps anything mentioning
//! that year anywhere in the URL.

use crate::SieveError;
use regex::Regex;

/// A compiled file filter
///
/// Without a pattern every link matches.
#[derive(Debug, Clone, Default)]
pub struct FilePattern {
    regex: Option<Regex>,
}

impl FilePattern {
    /// Compiles an optional pattern
    ///
    /// An invalid pattern is reported, never ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_sieve::crawler::FilePattern;
    ///
    /// let pattern = FilePattern::new(Some(r"\.nc$")).unwrap();
    /// assert!(pattern.is_match("https://example.com/pub/sst.nc"));
    /// assert!(!pattern.is_match("https://example.com/pub/sst.nc.md5"));
    /// assert!(FilePattern::new(Some("([a-z")).is_err());
    /// ```
    pub fn new(pattern: Option<&str>) -> Result<Self, SieveError> {
        let regex = pattern
            .map(|p| {
                Regex::new(p).map_err(|source| SieveError::Pattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .transpose()?;
        Ok(Self { regex })
    }

    /// Pattern matching every link
    pub fn any() -> Self {
        Self::default()
    }

    /// Pattern keeping links whose URL ends in `.{extension}`
    ///
    /// The extension is matched literally; a leading dot is optional.
    pub fn extension(extension: &str) -> Result<Self, SieveError> {
        let extension = extension.trim().trim_start_matches('.');
        Self::new(Some(&format!(r"\.{}$", regex::escape(extension))))
    }

    /// The source pattern, if any
    pub fn as_str(&self) -> Option<&str> {
        self.regex.as_ref().map(Regex::as_str)
    }

    /// Returns true if the pattern occurs anywhere in `link`
    pub fn is_match(&self, link: &str) -> bool {
        self.regex.as_ref().map_or(true, |re| re.is_match(link))
    }

    /// Keeps matching links, preserving order
    pub fn filter<S: AsRef<str>>(&self, links: &[S]) -> Vec<String> {
        links
            .iter()
            .map(AsRef::as_ref)
            .filter(|link| self.is_match(link))
            .map(str::to_string)
            .collect()
    }
}
