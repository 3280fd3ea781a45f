//! Sumi-Sieve main entry point
//!
//! This is the command-line interface for the Sumi-Sieve listing harvester.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use sumi_sieve::config::{load_config, validate, Config};
use sumi_sieve::crawler::{CrawlOptions, CrawlRequest, Crawler, FilePattern};
use sumi_sieve::output::{emit_listing, print_summary, write_listing};
use sumi_sieve::url::parse_base_url;
use sumi_sieve::Rebase;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Extension kept when no filter is given anywhere
const DEFAULT_EXTENSION: &str = "nc";

/// Sumi-Sieve: a directory-listing harvester
///
/// Sumi-Sieve reads an HTTP(S) directory listing, optionally descends into its
/// sub-directories, and prints every file URL matching a filter, one per line.
/// Save the output and feed it to a batch downloader, e.g. `wget -i file_list.txt`.
///
/// Without --pattern, --ext, --all or a configured pattern, only `.nc` files are
/// listed.
#[derive(Parser, Debug)]
#[command(name = "sumi-sieve")]
#[command(version)]
#[command(about = "Harvest file links from directory listings", long_about = None)]
struct Cli {
    /// Directory URL to crawl (include http:// or https://)
    #[arg(value_name = "BASE_URL")]
    base_url: String,

    /// Search sub-directories
    #[arg(short, long)]
    recurse: bool,

    /// Regular expression a file URL must contain
    #[arg(short, long, conflicts_with_all = ["ext", "all"])]
    pattern: Option<String>,

    /// Keep only files with this extension (shorthand for --pattern '\.EXT$') [default: nc]
    #[arg(short, long, value_name = "EXT", conflicts_with = "all")]
    ext: Option<String>,

    /// Keep every file link, whatever its name
    #[arg(short, long)]
    all: bool,

    /// Print links relative to the base URL instead of absolute
    #[arg(long, conflicts_with = "legacy_prefix")]
    relative: bool,

    /// Prefix every link with the base URL string, as older exports did
    #[arg(long)]
    legacy_prefix: bool,

    /// Maximum directory levels below the base URL
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Maximum listing pages to fetch
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Maximum concurrent listing fetches
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Write the URL list to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Validate inputs and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    let request = build_request(&cli, &config)?;

    if cli.dry_run {
        return handle_dry_run(&config, &request);
    }

    handle_crawl(&cli, &config, &request).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_sieve=info,warn"),
            1 => EnvFilter::new("sumi_sieve=debug,info"),
            2 => EnvFilter::new("sumi_sieve=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and layers command-line overrides on top
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(depth) = cli.max_depth {
        config.crawler.max_depth = depth;
    }
    if let Some(pages) = cli.max_pages {
        config.crawler.max_pages = pages;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.max_concurrent_fetches = concurrency;
    }
    if let Some(timeout) = cli.timeout {
        config.crawler.request_timeout_secs = timeout;
    }
    if let Some(output) = &cli.output {
        config.output.path = Some(output.display().to_string());
    }

    if let Some(ext) = &cli.ext {
        config.filter.pattern = extension_pattern(ext)?;
    } else if let Some(pattern) = &cli.pattern {
        config.filter.pattern = Some(pattern.clone());
    } else if cli.all {
        config.filter.pattern = None;
    } else if config.filter.pattern.is_none() {
        config.filter.pattern = extension_pattern(DEFAULT_EXTENSION)?;
    }

    validate(&config).context("Invalid settings")?;
    Ok(config)
}

fn extension_pattern(ext: &str) -> Result<Option<String>> {
    let pattern = FilePattern::extension(ext)?;
    Ok(pattern.as_str().map(str::to_string))
}

/// Builds the crawl request, failing fast on a malformed base URL
fn build_request(cli: &Cli, config: &Config) -> Result<CrawlRequest> {
    parse_base_url(&cli.base_url)?;

    let rebase = if cli.legacy_prefix {
        Rebase::LegacyPrefix
    } else {
        Rebase::from_prepend(!cli.relative)
    };

    Ok(CrawlRequest::new(cli.base_url.trim())
        .recurse(cli.recurse)
        .pattern(config.filter.pattern.clone())
        .rebase(rebase))
}

/// Handles the --dry-run mode: shows the effective settings
fn handle_dry_run(config: &Config, request: &CrawlRequest) -> Result<()> {
    println!("=== Sumi-Sieve Dry Run ===\n");

    println!("Request:");
    println!("  Base URL: {}", request.base_url);
    println!("  Recurse: {}", request.recurse);
    println!(
        "  Pattern: {}",
        request.pattern.as_deref().unwrap_or("<match everything>")
    );
    println!("  Output links: {:?}", request.rebase);

    println!("\nCrawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!(
        "\nOutput: {}",
        config.output.path.as_deref().unwrap_or("<stdout>")
    );

    println!("\n✓ Settings are valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, config: &Config, request: &CrawlRequest) -> Result<()> {
    let crawler = Crawler::new(CrawlOptions::from_config(config))?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            on_interrupt.cancel();
        }
    });

    let report = match crawler.crawl_with_cancellation(request, cancel).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    match &config.output.path {
        Some(path) => {
            write_listing(std::path::Path::new(path), &report.files)?;
            tracing::info!("Wrote {} links to {}", report.files.len(), path);
        }
        None => emit_listing(&mut std::io::stdout().lock(), &report.files)?,
    }

    if !cli.quiet {
        print_summary(&report);
    }

    Ok(())
}
