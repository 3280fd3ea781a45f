//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building one shared HTTP client with a proper user agent and timeouts
//! - GET requests for listing pages
//! - Error classification for logging
//! - Cancellation of in-flight requests
//!
//! Fetching fails soft: whatever goes wrong, the caller can fall back to an
//! empty page via [`FetchResult::into_body`].

use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// URL the body was served from, after redirects
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, body read failure, etc.)
    NetworkError {
        /// Error description
        error: String,
    },

    /// The crawl was cancelled while the request was in flight
    Cancelled,
}

impl FetchResult {
    /// Returns true if the page body was retrieved
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Consumes the result, yielding the body or empty content on any failure
    pub fn into_body(self) -> String {
        match self {
            Self::Success { body, .. } => body,
            _ => String::new(),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The client is built once per crawl and shared by every concurrent fetch so
/// connections to the mirror are pooled.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Bound applied to every request
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_sieve::config::UserAgentConfig;
/// use sumi_sieve::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL with a single GET request
///
/// # Outcome Mapping
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with readable body | `Success` |
/// | Any other status | `HttpError` |
/// | Timeout, connect or TLS failure, unreadable body | `NetworkError` |
/// | `cancel` fired first | `Cancelled` |
///
/// No retries are attempted.
pub async fn fetch_url(client: &Client, url: &str, cancel: &CancellationToken) -> FetchResult {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => FetchResult::Cancelled,
        result = get(client, url) => result,
    }
}

async fn get(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status = response.status();
    let final_url = response.url().clone();
    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => classify_error(&e),
    }
}

fn classify_error(e: &reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else if e.is_redirect() {
        "Too many redirects".to_string()
    } else {
        e.to_string()
    };
    FetchResult::NetworkError { error }
}

/// Fetches a listing page and logs the outcome
///
/// Failures are logged so a branch that silently contributes nothing can
/// still be traced.
pub async fn fetch_listing(client: &Client, url: &str, cancel: &CancellationToken) -> FetchResult {
    let result = fetch_url(client, url, cancel).await;
    match &result {
        FetchResult::Success {
            final_url,
            status_code,
            body,
        } => {
            if final_url.as_str() == url {
                tracing::debug!("Fetched {} ({}, {} bytes)", url, status_code, body.len());
            } else {
                tracing::debug!(
                    "Fetched {} via {} ({}, {} bytes)",
                    final_url,
                    url,
                    status_code,
                    body.len()
                );
            }
        }
        FetchResult::HttpError { status_code } => {
            tracing::warn!("HTTP {} for {}, treating as empty listing", status_code, url);
        }
        FetchResult::NetworkError { error } => {
            tracing::warn!("Failed to fetch {}: {}", url, error);
        }
        FetchResult::Cancelled => {
            tracing::debug!("Fetch of {} cancelled", url);
        }
    }
    result
}

/// Fetches a listing page, mapping every failure to empty content
pub async fn fetch(client: &Client, url: &str, cancel: &CancellationToken) -> String {
    fetch_listing(client, url, cancel).await.into_body()
}
