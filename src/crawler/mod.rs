//! Crawler module for directory-listing traversal
//!
//! This module contains the core crawling logic:
//! - HTTP fetching that fails soft
//! - HTML parsing and link extraction
//! - Classification of links into sub-directories and files
//! - Regex filtering of file links
//! - Bounded, cancellable, concurrent recursion

mod classifier;
mod context;
mod coordinator;
mod fetcher;
mod filter;
mod parser;

pub use classifier::{classify, is_subdirectory, Listing};
pub use context::{Claim, CrawlStats, TraversalContext, TraversalLimits};
pub use coordinator::{crawl, CrawlOptions, CrawlReport, CrawlRequest, Crawler};
pub use fetcher::{build_http_client, fetch, fetch_listing, fetch_url, FetchResult};
pub use filter::FilePattern;
pub use parser::extract_links;
