//! Crawl statistics display
//!
//! Summaries go to stderr so stdout can carry nothing but the URL list.

use crate::crawler::CrawlReport;

/// Formats a crawl report as a human-readable summary
pub fn format_summary(report: &CrawlReport) -> String {
    let stats = &report.stats;
    let mut out = String::new();

    out.push_str("=== Crawl Summary ===\n");
    out.push_str(&format!("Base URL: {}\n", report.base_url));
    out.push_str(&format!("Files found: {}\n", report.files.len()));
    out.push_str(&format!("Listings fetched: {}\n", stats.pages_fetched));
    out.push_str(&format!("Failed fetches: {}\n", stats.failed_fetches));
    out.push_str(&format!(
        "Elapsed: {:.2}s\n",
        report.elapsed.as_secs_f64()
    ));

    if stats.skipped_visited > 0 {
        out.push_str(&format!(
            "Already-visited links skipped: {}\n",
            stats.skipped_visited
        ));
    }
    if stats.skipped_out_of_scope > 0 {
        out.push_str(&format!(
            "Directories outside base skipped: {}\n",
            stats.skipped_out_of_scope
        ));
    }

    if report.truncated {
        out.push_str(&format!(
            "WARNING: traversal truncated ({} directories past max depth, {} past page limit)\n",
            stats.skipped_depth, stats.skipped_page_limit
        ));
    }
    if report.cancelled {
        out.push_str("WARNING: crawl cancelled, results are partial\n");
    }

    out
}

/// Prints the crawl summary to stderr
pub fn print_summary(report: &CrawlReport) {
    eprint!("{}", format_summary(report));
}
