//! Crawl report and summary types
//!
//! This module defines what a finished crawl hands to its caller:
//! - one record per visited page, in visit order
//! - summary counters
//! - a human-readable rendering for the command line

use crate::config::BackendKind;
use crate::extract::{LinkSource, SourceYield};
use crate::state::{AbortReason, CrawlStatus, PageState};
use crate::DiscoveryError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use url::Url;

/// Information about one visited page
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    /// The normalized URL that was dequeued
    pub url: String,

    /// URL after redirects (equal to `url` when there were none)
    pub final_url: String,

    /// Link distance from the nearest seed
    pub depth: u32,

    /// HTTP or render status
    pub status: Option<u16>,

    /// Final state of the page
    pub state: PageState,

    /// Page content, only kept when `retain-content` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Size of the content used for extraction (bytes)
    pub content_size: usize,

    pub elapsed_ms: u64,

    /// Raw and distinct link counts per source
    pub links: BTreeMap<LinkSource, SourceYield>,

    /// Distinct links after fusion
    pub fused_links: usize,

    /// Links from this page newly added to the frontier
    pub enqueued_links: usize,

    /// Fetch error for errored pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary statistics for a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Pages fetched and extracted successfully
    pub pages_crawled: usize,

    /// Pages whose fetch failed after all retries
    pub pages_errored: usize,

    /// Pages fetched but not HTML
    pub pages_skipped: usize,

    /// Pages that redirected to an already visited URL
    pub pages_duplicate: usize,

    /// Pages whose fused link set was empty
    pub pages_without_links: usize,

    /// Admitted links newly added to the frontier
    pub links_discovered: usize,

    /// Fused links outside the accepted domains
    pub links_filtered_by_domain: usize,

    /// Fused links inside the accepted domains but matching an exclusion pattern
    pub links_excluded_by_pattern: usize,

    /// Admitted links already visited or queued
    pub duplicate_links_skipped: usize,

    /// Admitted links dropped because the frontier was full
    pub frontier_overflow: usize,

    /// Admitted links deeper than `max-depth`
    pub links_beyond_depth: usize,

    /// References the normalizer rejected
    pub links_rejected: usize,

    /// Failed fetch attempts, retries included
    pub errors: usize,

    /// Extractor runs that failed or panicked
    pub extractor_failures: usize,

    /// Raw and distinct yields per source, summed over all pages
    pub per_source: BTreeMap<LinkSource, SourceYield>,
}

impl CrawlSummary {
    /// Adds one page's per-source yields to the totals
    pub fn add_yields(&mut self, yields: &BTreeMap<LinkSource, SourceYield>) {
        for (source, y) in yields {
            let total = self.per_source.entry(*source).or_default();
            total.raw += y.raw;
            total.unique += y.unique;
        }
    }

    /// Pages visited in any terminal state
    pub fn pages_visited(&self) -> usize {
        self.pages_crawled + self.pages_errored + self.pages_skipped + self.pages_duplicate
    }
}

/// Maximum number of entries kept per sample list
pub const SAMPLE_LIMIT: usize = 50;

/// A fused link that did not pass admission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilteredLink {
    pub url: String,
    /// `out_of_domain`, or the exclusion pattern that matched
    pub reason: String,
}

/// Bounded samples of links the crawl did not follow
///
/// Counters say how many links were dropped; the samples show which ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkSamples {
    pub filtered: Vec<FilteredLink>,
    pub duplicates: Vec<String>,
}

impl LinkSamples {
    pub fn push_filtered(&mut self, url: &Url, reason: impl Into<String>) {
        if self.filtered.len() < SAMPLE_LIMIT {
            self.filtered.push(FilteredLink {
                url: url.to_string(),
                reason: reason.into(),
            });
        }
    }

    pub fn push_duplicate(&mut self, url: &Url) {
        if self.duplicates.len() < SAMPLE_LIMIT {
            self.duplicates.push(url.to_string());
        }
    }
}

/// Everything a finished crawl produces
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub status: CrawlStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<AbortReason>,

    /// Backend that actually served the crawl
    pub backend: BackendKind,

    pub accepted_domains: Vec<String>,

    /// Visited pages in visit order
    pub pages: Vec<PageRecord>,

    pub summary: CrawlSummary,

    /// Examples of filtered and duplicate links
    pub samples: LinkSamples,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Writes the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<(), DiscoveryError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Prints a crawl report to stdout in a formatted manner
pub fn print_summary(report: &CrawlReport) {
    let summary = &report.summary;

    println!("=== Crawl Summary ===\n");

    print!("Status: {}", report.status);
    if let Some(reason) = report.abort_reason {
        print!(" ({})", reason);
    }
    println!();
    println!("Backend: {:?}", report.backend);
    println!("Accepted domains: {}", report.accepted_domains.join(", "));
    println!("Duration: {}s", report.duration_seconds());
    println!();

    println!("Pages:");
    println!("  Crawled: {}", summary.pages_crawled);
    println!("  Errored: {}", summary.pages_errored);
    println!("  Skipped (not HTML): {}", summary.pages_skipped);
    println!("  Redirect duplicates: {}", summary.pages_duplicate);
    println!("  Without links: {}", summary.pages_without_links);
    println!();

    println!("Links:");
    println!("  Discovered: {}", summary.links_discovered);
    println!("  Filtered by domain: {}", summary.links_filtered_by_domain);
    println!("  Excluded by pattern: {}", summary.links_excluded_by_pattern);
    println!("  Duplicates skipped: {}", summary.duplicate_links_skipped);
    println!("  Frontier overflow: {}", summary.frontier_overflow);
    println!("  Beyond max depth: {}", summary.links_beyond_depth);
    println!("  Rejected by normalizer: {}", summary.links_rejected);
    println!();

    println!("Sources (raw / distinct):");
    for source in LinkSource::ALL {
        let y = summary.per_source.get(&source).copied().unwrap_or_default();
        println!("  {:<16} {} / {}", source.name(), y.raw, y.unique);
    }
    println!();

    println!(
        "Errors: {} failed fetch attempt(s), {} extractor failure(s)",
        summary.errors, summary.extractor_failures
    );

    if !report.samples.filtered.is_empty() {
        println!();
        println!("Filtered (sample of {}):", report.samples.filtered.len());
        for link in report.samples.filtered.iter().take(10) {
            println!("  {} [{}]", link.url, link.reason);
        }
    }
}
