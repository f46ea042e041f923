//! Output module for crawl reports and diagnostics
//!
//! This module handles:
//! - The report and summary returned by a crawl
//! - Printing a human-readable summary
//! - The diagnostic sink the coordinator writes discovery events to

mod diagnostics;
mod summary;

pub use diagnostics::{DiagnosticRecord, DiagnosticSink, MemorySink, TracingSink};
pub use summary::{
    print_summary, CrawlReport, CrawlSummary, FilteredLink, LinkSamples, PageRecord, SAMPLE_LIMIT,
};
