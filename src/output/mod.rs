//! Output module for crawl results
//!
//! This module handles:
//! - Rendering the URL list as newline-delimited text
//! - Writing it to a file that batch downloaders read directly
//!   (`wget -i file_list.txt`)
//! - Printing crawl statistics

pub mod stats;

pub use stats::{format_summary, print_summary};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// File name suggested for exported URL lists
pub const DEFAULT_LISTING_FILE: &str = "file_list.txt";

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Renders links one per line
///
/// Every line, the last included, ends with `\n`; an empty list renders as an
/// empty string.
///
/// # Example
///
/// ```
/// use sumi_sieve::output::render_listing;
///
/// let links = vec!["https://example.com/a.nc".to_string()];
/// assert_eq!(render_listing(&links), "https://example.com/a.nc\n");
/// ```
pub fn render_listing<S: AsRef<str>>(links: &[S]) -> String {
    let mut out = String::new();
    for link in links {
        out.push_str(link.as_ref());
        out.push('\n');
    }
    out
}

/// Writes the rendered listing to `path`, replacing any existing file
pub fn write_listing<S: AsRef<str>>(path: &Path, links: &[S]) -> OutputResult<()> {
    let to_write_error = |source| OutputError::Write {
        path: path.display().to_string(),
        source,
    };

    let file = File::create(path).map_err(to_write_error)?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(render_listing(links).as_bytes())
        .map_err(to_write_error)?;
    writer.flush().map_err(to_write_error)?;

    Ok(())
}

/// Writes the rendered listing to any writer (stdout in the CLI)
pub fn emit_listing<W: Write, S: AsRef<str>>(writer: &mut W, links: &[S]) -> OutputResult<()> {
    writer.write_all(render_listing(links).as_bytes())?;
    writer.flush()?;
    Ok(())
}
