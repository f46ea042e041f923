//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: Tracks the state of individual pages (queued, fetching, extracted, ...)
//! - `CrawlStatus`: Crawl-level status (running, completed, aborted)
//! - `CrawlState`: Frontier, visited set and counters for one crawl

mod crawl_state;
mod page_state;

// Re-export main types
pub use crawl_state::{CrawlState, EnqueueReport, FinishedCrawl, NextPage, RedirectClaim};
pub use page_state::{AbortReason, CrawlStatus, PageState};
