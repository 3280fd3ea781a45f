//! Traversal context shared by every branch of one crawl
//!
//! A context is created per crawl and handed down the recursion explicitly.
//! Clones share the visited set, the fetch permits, the cancellation token
//! and the counters; each clone carries its own depth.

use crate::url::normalize_url;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Bounds applied to one crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalLimits {
    /// Directory levels allowed below the base URL
    pub max_depth: u32,

    /// Listing pages that may be fetched, base URL included
    pub max_pages: usize,

    /// Listing fetches allowed in flight at once
    pub max_concurrent_fetches: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_depth: 16,
            max_pages: 10_000,
            max_concurrent_fetches: 8,
        }
    }
}

/// Outcome of trying to reserve a URL for fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller now owns this URL and must fetch it
    Claimed,
    /// Another branch already claimed it
    AlreadyVisited,
    /// The page cap is exhausted
    PageLimit,
    /// The URL cannot be normalized
    Invalid,
}

/// Counters collected while crawling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Listing pages fetched successfully
    pub pages_fetched: usize,
    /// Listing fetches that failed or were cancelled
    pub failed_fetches: usize,
    /// Sub-directories not entered because the depth budget ran out
    pub skipped_depth: usize,
    /// Sub-directories not entered because the page cap was hit
    pub skipped_page_limit: usize,
    /// Sub-directory links outside the base URL's tree
    pub skipped_out_of_scope: usize,
    /// Sub-directory links already visited by some branch
    pub skipped_visited: usize,
}

impl CrawlStats {
    /// Returns true if any limit cut the traversal short
    pub fn is_truncated(&self) -> bool {
        self.skipped_depth > 0 || self.skipped_page_limit > 0
    }
}

#[derive(Debug, Default)]
struct Counters {
    pages_fetched: AtomicUsize,
    failed_fetches: AtomicUsize,
    skipped_depth: AtomicUsize,
    skipped_page_limit: AtomicUsize,
    skipped_out_of_scope: AtomicUsize,
    skipped_visited: AtomicUsize,
}

#[derive(Debug)]
struct Shared {
    base: Url,
    limits: TraversalLimits,
    visited: Mutex<HashSet<String>>,
    permits: Semaphore,
    cancel: CancellationToken,
    counters: Counters,
}

/// Per-crawl state passed down the recursion
#[derive(Debug, Clone)]
pub struct TraversalContext {
    shared: Arc<Shared>,
    depth: u32,
}

impl TraversalContext {
    /// Creates the root context for a crawl of `base`
    pub fn new(base: Url, limits: TraversalLimits, cancel: CancellationToken) -> Self {
        let permits = Semaphore::new(limits.max_concurrent_fetches.max(1));
        Self {
            shared: Arc::new(Shared {
                base,
                limits,
                visited: Mutex::new(HashSet::new()),
                permits,
                cancel,
                counters: Counters::default(),
            }),
            depth: 0,
        }
    }

    /// The base URL of this crawl
    pub fn base(&self) -> &Url {
        &self.shared.base
    }

    /// Depth of this context below the base URL
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Directory levels still allowed below this one
    pub fn remaining_depth(&self) -> u32 {
        self.shared.limits.max_depth.saturating_sub(self.depth)
    }

    /// Context for a sub-directory, or None when the depth budget is spent
    pub fn child(&self) -> Option<Self> {
        if self.remaining_depth() == 0 {
            return None;
        }
        Some(Self {
            shared: Arc::clone(&self.shared),
            depth: self.depth + 1,
        })
    }

    /// Atomically reserves a URL for fetching
    ///
    /// URLs are compared by their normalized form, so `../`, query-string
    /// and fragment variants of a listing all collapse to one entry.
    pub fn claim(&self, url: &str) -> Claim {
        let key = match normalize_url(url) {
            Ok(normalized) => normalized.to_string(),
            Err(e) => {
                tracing::debug!("Not claiming {}: {}", url, e);
                return Claim::Invalid;
            }
        };

        let mut visited = self
            .shared
            .visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if visited.contains(&key) {
            return Claim::AlreadyVisited;
        }
        if visited.len() >= self.shared.limits.max_pages {
            return Claim::PageLimit;
        }
        visited.insert(key);
        Claim::Claimed
    }

    /// Returns true if the URL (in normalized form) was already claimed
    pub fn is_visited(&self, url: &str) -> bool {
        let Ok(normalized) = normalize_url(url) else {
            return false;
        };
        self.shared
            .visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(normalized.as_str())
    }

    /// Number of URLs claimed so far
    pub fn visited_count(&self) -> usize {
        self.shared
            .visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Waits for a fetch slot; None if the crawl is cancelled first
    pub async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => None,
            permit = self.shared.permits.acquire() => permit.ok(),
        }
    }

    /// The crawl-wide cancellation token
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.shared.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub fn record_fetch(&self, success: bool) {
        let counter = if success {
            &self.shared.counters.pages_fetched
        } else {
            &self.shared.counters.failed_fetches
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self, claim: Claim) {
        let counters = &self.shared.counters;
        match claim {
            Claim::AlreadyVisited => counters.skipped_visited.fetch_add(1, Ordering::Relaxed),
            Claim::PageLimit => counters.skipped_page_limit.fetch_add(1, Ordering::Relaxed),
            Claim::Claimed | Claim::Invalid => return,
        };
    }

    pub fn record_depth_limited(&self) {
        self.shared
            .counters
            .skipped_depth
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_out_of_scope(&self) {
        self.shared
            .counters
            .skipped_out_of_scope
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> CrawlStats {
        let c = &self.shared.counters;
        CrawlStats {
            pages_fetched: c.pages_fetched.load(Ordering::Relaxed),
            failed_fetches: c.failed_fetches.load(Ordering::Relaxed),
            skipped_depth: c.skipped_depth.load(Ordering::Relaxed),
            skipped_page_limit: c.skipped_page_limit.load(Ordering::Relaxed),
            skipped_out_of_scope: c.skipped_out_of_scope.load(Ordering::Relaxed),
            skipped_visited: c.skipped_visited.load(Ordering::Relaxed),
        }
    }
}
