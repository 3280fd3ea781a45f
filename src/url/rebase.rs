use crate::url::scope::{is_within, scope_root};
use url::Url;

/// How output links are anchored to the base URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rebase {
    /// Emit each resolved absolute URL unchanged
    #[default]
    Absolute,
    /// Emit links under the base directory relative to it; others stay absolute
    Relative,
    /// Concatenate the base URL string onto every link
    ///
    /// Kept only for byte-compatibility with older exports. Applied to
    /// absolute links this yields malformed URLs such as
    /// `https://h/pub/https://h/pub/a.nc`.
    LegacyPrefix,
}

impl Rebase {
    /// Maps the `prepend_base` switch onto a rebase mode
    pub fn from_prepend(prepend_base: bool) -> Self {
        if prepend_base {
            Self::Absolute
        } else {
            Self::Relative
        }
    }

    /// Rewrites a single absolute link for output
    pub fn apply(&self, base: &Url, link: &str) -> String {
        match self {
            Self::Absolute => link.to_string(),
            Self::Relative => relative_to(base, link).unwrap_or_else(|| link.to_string()),
            Self::LegacyPrefix => format!("{}{}", base.as_str(), link),
        }
    }
}

/// Rewrites every link in order
pub fn rebase_links(mode: Rebase, base: &Url, links: &[String]) -> Vec<String> {
    links.iter().map(|link| mode.apply(base, link)).collect()
}

/// Strips the base directory from a link inside it
fn relative_to(base: &Url, link: &str) -> Option<String> {
    let parsed = Url::parse(link).ok()?;
    if !is_within(base, &parsed) {
        return None;
    }

    let root = scope_root(base);
    parsed
        .as_str()
        .strip_prefix(root.as_str())
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}
