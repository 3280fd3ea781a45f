//! Crawler coordinator - recursive crawl orchestration
//!
//! This module ties the pipeline together for one crawl:
//! - Validating the base URL and filter before any request is sent
//! - Fetch, parse, classify and filter for each listing page
//! - Concurrent descent into sub-directories, bounded by the traversal context
//! - Ordered merging of branch results
//! - Rebasing output links

use crate::config::{
    validate_crawler_config, validate_user_agent_config, Config, CrawlerConfig, UserAgentConfig,
};
use crate::crawler::classifier::classify;
use crate::crawler::context::{Claim, CrawlStats, TraversalContext, TraversalLimits};
use crate::crawler::fetcher::{build_http_client, fetch_listing, FetchResult};
use crate::crawler::filter::FilePattern;
use crate::crawler::parser::extract_links;
use crate::url::{is_within, normalize_url, parse_base_url, rebase_links, scope_root, Rebase};
use crate::{ConfigError, SieveError};
use futures::future::{join_all, BoxFuture, FutureExt};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Settings shared by every crawl a [`Crawler`] runs
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub user_agent: UserAgentConfig,
    pub limits: TraversalLimits,
    pub request_timeout: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CrawlOptions {
    /// Builds crawl options from a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            limits: TraversalLimits {
                max_depth: config.crawler.max_depth,
                max_pages: config.crawler.max_pages as usize,
                max_concurrent_fetches: config.crawler.max_concurrent_fetches as usize,
            },
            request_timeout: Duration::from_secs(config.crawler.request_timeout_secs),
        }
    }

    /// Checks the limits, timeout and user agent against the configuration rules
    ///
    /// `max_depth = 0` is valid and crawls the base listing only.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let crawler = CrawlerConfig {
            max_depth: self.limits.max_depth,
            max_pages: u32::try_from(self.limits.max_pages).unwrap_or(u32::MAX),
            max_concurrent_fetches: u32::try_from(self.limits.max_concurrent_fetches)
                .unwrap_or(u32::MAX),
            request_timeout_secs: self.request_timeout.as_secs(),
        };
        validate_crawler_config(&crawler)?;
        validate_user_agent_config(&self.user_agent)
    }
}

/// One crawl invocation
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// Top-level directory URL
    pub base_url: String,
    /// Descend into sub-directories
    pub recurse: bool,
    /// Regex searched for in each file URL; None keeps every file
    pub pattern: Option<String>,
    /// How output links are anchored to the base URL
    pub rebase: Rebase,
}

impl CrawlRequest {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            recurse: false,
            pattern: None,
            rebase: Rebase::Absolute,
        }
    }

    pub fn recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn pattern(mut self, pattern: Option<impl Into<String>>) -> Self {
        self.pattern = pattern.map(Into::into);
        self
    }

    pub fn prepend_base(mut self, prepend_base: bool) -> Self {
        self.rebase = Rebase::from_prepend(prepend_base);
        self
    }

    pub fn rebase(mut self, rebase: Rebase) -> Self {
        self.rebase = rebase;
        self
    }
}

/// Result of one crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// The parsed base URL
    pub base_url: Url,
    /// Matching file links: each directory's own files first, then its
    /// sub-directories' results in listing order
    pub files: Vec<String>,
    /// Traversal counters
    pub stats: CrawlStats,
    /// A depth or page limit cut the traversal short
    pub truncated: bool,
    /// The crawl was cancelled; `files` holds what was gathered before that
    pub cancelled: bool,
    /// Wall-clock duration
    pub elapsed: Duration,
}

/// Directory-listing crawler
///
/// Holds one HTTP client reused by every fetch of every crawl it runs.
pub struct Crawler {
    options: CrawlOptions,
    client: Client,
}

impl Crawler {
    /// Creates a crawler, building its HTTP client
    ///
    /// # Errors
    ///
    /// Returns [`SieveError::Config`] if the options are out of range, so an
    /// invalid crawler never sends a request.
    pub fn new(options: CrawlOptions) -> Result<Self, SieveError> {
        options.validate()?;
        let client = build_http_client(&options.user_agent, options.request_timeout)?;
        Ok(Self { options, client })
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Runs a crawl to completion
    pub async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlReport, SieveError> {
        self.crawl_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Runs a crawl that stops early when `cancel` fires
    ///
    /// In-flight fetches are abandoned and no new ones start; the report holds
    /// every file found before cancellation.
    ///
    /// # Errors
    ///
    /// Returns an error before any request is made if the base URL is not an
    /// absolute HTTP(S) URL or the filter pattern does not compile.
    pub async fn crawl_with_cancellation(
        &self,
        request: &CrawlRequest,
        cancel: CancellationToken,
    ) -> Result<CrawlReport, SieveError> {
        let base = parse_base_url(&request.base_url)?;
        let pattern = FilePattern::new(request.pattern.as_deref())?;

        if request.recurse && !base.path().ends_with('/') {
            tracing::warn!(
                "Base URL {} does not end with '/'; recursion is confined to {}",
                base,
                scope_root(&base)
            );
        }

        tracing::info!(
            "Crawling {} (recurse: {}, pattern: {})",
            base,
            request.recurse,
            pattern.as_str().unwrap_or("<any>")
        );

        let start = Instant::now();
        let ctx = TraversalContext::new(base.clone(), self.options.limits, cancel);

        let files = match ctx.claim(base.as_str()) {
            Claim::Claimed => {
                self.crawl_directory(base.clone(), request.recurse, &pattern, ctx.clone())
                    .await
            }
            claim => {
                tracing::warn!("Not fetching base URL {}: {:?}", base, claim);
                ctx.record_skip(claim);
                Vec::new()
            }
        };
        let files = rebase_links(request.rebase, &base, &files);

        let stats = ctx.stats();
        let report = CrawlReport {
            base_url: base,
            files,
            truncated: stats.is_truncated(),
            cancelled: ctx.is_cancelled(),
            stats,
            elapsed: start.elapsed(),
        };

        if report.cancelled {
            tracing::warn!(
                "Crawl cancelled after {} pages; returning {} files found so far",
                report.stats.pages_fetched,
                report.files.len()
            );
        } else {
            tracing::info!(
                "Crawl completed: {} files from {} pages in {:?}",
                report.files.len(),
                report.stats.pages_fetched,
                report.elapsed
            );
        }

        Ok(report)
    }

    /// Crawls one directory and, when recursing, everything below it
    ///
    /// The directory must already be claimed in `ctx`.
    fn crawl_directory<'a>(
        &'a self,
        dir: Url,
        recurse: bool,
        pattern: &'a FilePattern,
        ctx: TraversalContext,
    ) -> BoxFuture<'a, Vec<String>> {
        async move {
            let (page_url, content) = {
                let Some(_permit) = ctx.acquire().await else {
                    return Vec::new();
                };
                let result = fetch_listing(&self.client, dir.as_str(), ctx.cancel_token()).await;
                ctx.record_fetch(result.is_success());
                match result {
                    FetchResult::Success {
                        final_url, body, ..
                    } => (final_url, body),
                    _ => (dir.clone(), String::new()),
                }
            };

            // A redirected listing is claimed under its final URL too, so the
            // target is never fetched a second time by another branch.
            if normalize_url(page_url.as_str()).ok() != normalize_url(dir.as_str()).ok()
                && ctx.claim(page_url.as_str()) == Claim::AlreadyVisited
            {
                tracing::debug!("{} redirected to already-visited {}", dir, page_url);
                return Vec::new();
            }

            let listing = classify(extract_links(&content, &page_url));
            let mut files = pattern.filter(&listing.candidates);

            tracing::debug!(
                "{}: {} links, {} sub-directories, {} matching files (depth {})",
                dir,
                listing.len(),
                listing.sub_dirs.len(),
                files.len(),
                ctx.depth()
            );

            if !recurse || listing.sub_dirs.is_empty() || ctx.is_cancelled() {
                return files;
            }

            let mut branches = Vec::new();
            for sub_dir in &listing.sub_dirs {
                let Ok(sub_url) = Url::parse(sub_dir) else {
                    continue;
                };

                if !is_within(ctx.base(), &sub_url) {
                    ctx.record_out_of_scope();
                    continue;
                }

                let Some(child) = ctx.child() else {
                    // Only directories not yet seen count against the depth budget.
                    if !ctx.is_visited(sub_dir) {
                        ctx.record_depth_limited();
                        tracing::warn!(
                            "Max depth {} reached, not descending into {}",
                            ctx.depth(),
                            sub_dir
                        );
                    }
                    continue;
                };

                match ctx.claim(sub_dir) {
                    Claim::Claimed => {
                        branches.push(self.crawl_directory(sub_url, recurse, pattern, child));
                    }
                    Claim::PageLimit => {
                        ctx.record_skip(Claim::PageLimit);
                        tracing::warn!("Page limit reached, not descending into {}", sub_dir);
                    }
                    claim => ctx.record_skip(claim),
                }
            }

            // join_all yields results in listing order regardless of completion order.
            for branch_files in join_all(branches).await {
                files.extend(branch_files);
            }

            files
        }
        .boxed()
    }
}

/// Crawls a directory listing with default options
///
/// Convenience wrapper over [`Crawler`] for one-off use.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> Result<(), sumi_sieve::SieveError> {
/// let files = sumi_sieve::crawl(
///     "https://www.ncei.noaa.gov/pub/data/cmb/ersst/v5/netcdf/",
///     false,
///     Some(r"\.nc$"),
///     true,
/// )
/// .await?;
/// println!("{}", files.join("\n"));
/// # Ok(())
/// # }
/// ```
pub async fn crawl(
    base_url: &str,
    recurse: bool,
    pattern: Option<&str>,
    prepend_base: bool,
) -> Result<Vec<String>, SieveError> {
    let crawler = Crawler::new(CrawlOptions::default())?;
    let request = CrawlRequest::new(base_url)
        .recurse(recurse)
        .pattern(pattern)
        .prepend_base(prepend_base);
    Ok(crawler.crawl(&request).await?.files)
}
