//! Structured diagnostics emitted while crawling
//!
//! The coordinator never logs discovery events directly. It appends records
//! to an injected [`DiagnosticSink`]; the default sink renders them through
//! `tracing`, and tests use [`MemorySink`] to assert on them.

use crate::config::BackendKind;
use crate::extract::{LinkSource, SourceYield};
use crate::state::{AbortReason, CrawlStatus};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use tracing::Level;
use url::Url;

/// One diagnostic event
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticRecord {
    /// Raw yield of one source on one page
    SourceYield {
        page: Url,
        source: LinkSource,
        count: usize,
        note: Option<String>,
    },

    /// An extractor failed and contributed nothing
    ExtractorFailed {
        page: Url,
        source: LinkSource,
        message: String,
    },

    /// Fused link set for a page is empty
    EmptyLinkSet {
        page: Url,
        host: String,
        content_size: usize,
        candidate_count: usize,
        rejected: usize,
        accepted_domains: Vec<String>,
        per_source: BTreeMap<LinkSource, SourceYield>,
    },

    /// Links were found but none passed admission
    AllLinksRejected {
        page: Url,
        fused: usize,
        out_of_domain: usize,
        excluded: usize,
        accepted_domains: Vec<String>,
    },

    /// A fetch attempt failed
    FetchFailed {
        page: Url,
        attempt: u32,
        error: String,
        will_retry: bool,
    },

    /// An admitted link did not fit in the frontier
    FrontierOverflow { page: Url, link: Url, max_size: usize },

    /// Periodic crawl progress
    Progress {
        visited: usize,
        max_pages: usize,
        queued: usize,
    },

    /// Backend chosen for the crawl
    BackendSelected { backend: BackendKind, reason: String },

    /// The crawl stopped
    CrawlFinished {
        status: CrawlStatus,
        abort_reason: Option<AbortReason>,
        pages_visited: usize,
    },
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceYield {
                source,
                count,
                note,
                ..
            } => {
                write!(f, "[{}] {} link(s) found", source, count)?;
                if let Some(note) = note {
                    write!(f, " ({})", note)?;
                }
                Ok(())
            }
            Self::ExtractorFailed {
                page,
                source,
                message,
            } => write!(f, "[{}] extractor failed on {}: {}", source, page, message),
            Self::EmptyLinkSet {
                page,
                host,
                content_size,
                candidate_count,
                rejected,
                accepted_domains,
                per_source,
            } => {
                write!(
                    f,
                    "no links on {}: candidates={} rejected={} content_size={} host={} accepted_domains=[{}]",
                    page,
                    candidate_count,
                    rejected,
                    content_size,
                    host,
                    accepted_domains.join(", ")
                )?;
                for (source, y) in per_source {
                    write!(f, " {}={}", source, y.raw)?;
                }
                Ok(())
            }
            Self::AllLinksRejected {
                page,
                fused,
                out_of_domain,
                excluded,
                accepted_domains,
            } => write!(
                f,
                "all {} link(s) on {} rejected: out_of_domain={} excluded={} accepted_domains=[{}]",
                fused,
                page,
                out_of_domain,
                excluded,
                accepted_domains.join(", ")
            ),
            Self::FetchFailed {
                page,
                attempt,
                error,
                will_retry,
            } => write!(
                f,
                "fetch attempt {} for {} failed: {}{}",
                attempt,
                page,
                error,
                if *will_retry { " (retrying)" } else { "" }
            ),
            Self::FrontierOverflow {
                page,
                link,
                max_size,
            } => write!(
                f,
                "frontier full ({}), dropped {} found on {}",
                max_size, link, page
            ),
            Self::Progress {
                visited,
                max_pages,
                queued,
            } => write!(f, "{}/{} pages | queue: {}", visited, max_pages, queued),
            Self::BackendSelected { backend, reason } => {
                write!(f, "using {:?} backend: {}", backend, reason)
            }
            Self::CrawlFinished {
                status,
                abort_reason,
                pages_visited,
            } => {
                write!(f, "crawl {} after {} page(s)", status, pages_visited)?;
                if let Some(reason) = abort_reason {
                    write!(f, ": {}", reason)?;
                }
                Ok(())
            }
        }
    }
}

/// Append-only destination for diagnostic records
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, record: DiagnosticRecord);
}

impl DiagnosticRecord {
    /// Level the record is logged at by [`TracingSink`]
    pub fn level(&self) -> Level {
        match self {
            Self::EmptyLinkSet { .. }
            | Self::AllLinksRejected { .. }
            | Self::ExtractorFailed { .. }
            | Self::FrontierOverflow { .. } => Level::WARN,
            Self::FetchFailed { will_retry: true, .. } => Level::DEBUG,
            Self::FetchFailed { .. } => Level::WARN,
            Self::SourceYield { .. }
            | Self::Progress { .. }
            | Self::BackendSelected { .. }
            | Self::CrawlFinished { .. } => Level::INFO,
        }
    }
}

/// Renders records through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, record: DiagnosticRecord) {
        let level = record.level();
        if level == Level::WARN {
            tracing::warn!("{}", record)
        } else if level == Level::DEBUG {
            tracing::debug!("{}", record)
        } else if let DiagnosticRecord::SourceYield { page, .. } = &record {
            tracing::info!(page = %page, "{}", record)
        } else {
            tracing::info!("{}", record)
        }
    }
}

/// Collects records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Returns the records matching a predicate
    pub fn filter<F>(&self, predicate: F) -> Vec<DiagnosticRecord>
    where
        F: Fn(&DiagnosticRecord) -> bool,
    {
        self.records().into_iter().filter(|r| predicate(r)).collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, record: DiagnosticRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://site.test/").unwrap()
    }

    #[test]
    fn test_source_yield_format() {
        let record = DiagnosticRecord::SourceYield {
            page: page(),
            source: LinkSource::StaticMarkup,
            count: 3,
            note: None,
        };
        assert_eq!(record.to_string(), "[StaticMarkup] 3 link(s) found");

        let record = DiagnosticRecord::SourceYield {
            page: page(),
            source: LinkSource::RenderedDom,
            count: 0,
            note: Some("backend provides no rendered page".to_string()),
        };
        assert_eq!(
            record.to_string(),
            "[RenderedDom] 0 link(s) found (backend provides no rendered page)"
        );
    }

    #[test]
    fn test_empty_link_set_dump() {
        let mut per_source = BTreeMap::new();
        per_source.insert(LinkSource::StaticMarkup, SourceYield { raw: 2, unique: 0 });
        let record = DiagnosticRecord::EmptyLinkSet {
            page: page(),
            host: "site.test".to_string(),
            content_size: 1234,
            candidate_count: 2,
            rejected: 2,
            accepted_domains: vec!["site.test".to_string()],
            per_source,
        };
        let text = record.to_string();
        assert!(text.contains("content_size=1234"));
        assert!(text.contains("host=site.test"));
        assert!(text.contains("accepted_domains=[site.test]"));
        assert!(text.contains("StaticMarkup=2"));
    }

    #[test]
    fn test_source_yield_and_progress_log_at_info() {
        let yield_record = DiagnosticRecord::SourceYield {
            page: page(),
            source: LinkSource::MarkdownText,
            count: 0,
            note: None,
        };
        let progress = DiagnosticRecord::Progress {
            visited: 10,
            max_pages: 50,
            queued: 4,
        };
        let retrying = DiagnosticRecord::FetchFailed {
            page: page(),
            attempt: 1,
            error: "timeout".to_string(),
            will_retry: true,
        };

        assert_eq!(yield_record.level(), Level::INFO);
        assert_eq!(progress.level(), Level::INFO);
        assert_eq!(retrying.level(), Level::DEBUG);
        let given_up = DiagnosticRecord::FetchFailed {
            page: page(),
            attempt: 3,
            error: "timeout".to_string(),
            will_retry: false,
        };
        assert_eq!(given_up.level(), Level::WARN);
    }

    #[test]
    fn test_progress_format() {
        let record = DiagnosticRecord::Progress {
            visited: 20,
            max_pages: 200,
            queued: 37,
        };
        assert_eq!(record.to_string(), "20/200 pages | queue: 37");
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        sink.record(DiagnosticRecord::BackendSelected {
            backend: BackendKind::Static,
            reason: "configured".to_string(),
        });
        sink.record(DiagnosticRecord::CrawlFinished {
            status: CrawlStatus::Completed,
            abort_reason: None,
            pages_visited: 1,
        });

        assert_eq!(sink.records().len(), 2);
        let finished =
            sink.filter(|r| matches!(r, DiagnosticRecord::CrawlFinished { .. }));
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].to_string(), "crawl completed after 1 page(s)");
    }
}
