//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the BFS loop that ties everything together:
//! - Seeding the frontier
//! - Handing URLs to one or more workers
//! - Fetching, extracting, fusing and admitting links per page
//! - Enforcing the page cap, error budget, overflow policy and deadline
//! - Building the final report

use super::fetcher::{fetch_with_retry, PageFetchResult, PageFetcher};
use super::frontier::{PushOutcome, QueuedUrl};
use crate::config::{Config, OverflowPolicy};
use crate::extract::{default_extractors, fuse, run_extractors, ExtractorOutput, FusedLinkSet, LinkExtractor};
use crate::output::{CrawlReport, DiagnosticRecord, DiagnosticSink, PageRecord, TracingSink};
use crate::state::{AbortReason, CrawlState, FinishedCrawl, NextPage, PageState, RedirectClaim};
use crate::url::{normalize_url, Admission, AdmissionFilter};
use crate::DiscoveryError;
use chrono::Utc;
use futures::future::join_all;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use url::Url;

/// Visited pages between two progress records
const PROGRESS_INTERVAL: usize = 10;

/// Links of one page after admission
#[derive(Debug, Default)]
struct Admitted {
    links: Vec<Url>,
    /// Rejected links with the reason
    filtered: Vec<(Url, String)>,
    out_of_domain: usize,
    excluded: usize,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    extractors: Vec<Box<dyn LinkExtractor>>,
    filter: AdmissionFilter,
    sink: Arc<dyn DiagnosticSink>,
    state: Mutex<CrawlState>,
    notify: Notify,
    /// Seeds that did not fit in the frontier
    dropped_seeds: Vec<Url>,
}

impl Coordinator {
    /// Creates a coordinator with the default extractors and a tracing sink
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Frontier seeded, ready to run
    /// * `Err(DiscoveryError)` - No seed, an invalid seed, or an empty domain set
    pub fn new(config: Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self, DiscoveryError> {
        let filter = AdmissionFilter::from_config(&config)?;

        let mut state = CrawlState::new(config.crawl.max_frontier_size);
        let mut dropped_seeds = Vec::new();
        for seed in &config.crawl.seeds {
            let url = normalize_url(seed)?;
            if state.seed(url.clone()) == PushOutcome::Overflow {
                dropped_seeds.push(url);
            }
        }

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            extractors: default_extractors(),
            filter,
            sink: Arc::new(TracingSink),
            state: Mutex::new(state),
            notify: Notify::new(),
            dropped_seeds,
        })
    }

    /// Replaces the extractor list
    pub fn with_extractors(mut self, extractors: Vec<Box<dyn LinkExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    /// Replaces the diagnostic sink
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Runs the crawl to completion and returns its report
    ///
    /// Per-page failures never end the crawl; only the page cap, an empty
    /// frontier, the consecutive error budget, the overflow policy or the
    /// global deadline do. Partial results are kept in every case.
    pub async fn run(self) -> CrawlReport {
        let started_at = Utc::now();
        let workers = self.config.crawl.workers.max(1);

        tracing::info!(
            "Starting crawl: {} seed(s), max {} page(s), {} worker(s), {:?} backend",
            self.config.crawl.seeds.len(),
            self.config.crawl.max_pages,
            workers,
            self.fetcher.backend()
        );

        for seed in &self.dropped_seeds {
            self.sink.record(DiagnosticRecord::FrontierOverflow {
                page: seed.clone(),
                link: seed.clone(),
                max_size: self.config.crawl.max_frontier_size,
            });
        }

        let drive = join_all((0..workers).map(|id| self.worker(id)));
        match self.config.crawl.crawl_deadline_secs {
            Some(secs) => {
                if tokio::time::timeout(Duration::from_secs(secs), drive).await.is_err() {
                    tracing::warn!("Crawl deadline of {}s reached", secs);
                    self.lock_state().abort(AbortReason::Deadline);
                }
            }
            None => {
                drive.await;
            }
        }

        if let Err(e) = self.fetcher.close().await {
            tracing::warn!("Failed to close fetch backend: {}", e);
        }

        let backend = self.fetcher.backend();
        let accepted_domains = self.filter.accepted_domains().iter().cloned().collect();
        let mut state = self
            .state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.complete();
        let visited = state.visited_count();
        let FinishedCrawl {
            pages,
            summary,
            samples,
            status,
            abort_reason,
        } = state.finish();

        self.sink.record(DiagnosticRecord::CrawlFinished {
            status,
            abort_reason,
            pages_visited: visited,
        });

        CrawlReport {
            status,
            abort_reason,
            backend,
            accepted_domains,
            pages,
            summary,
            samples,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn worker(&self, id: usize) {
        loop {
            // Registered before the state check so a wakeup between the two is not lost
            let notified = self.notify.notified();

            let next = self.lock_state().next_page(self.config.crawl.max_pages);
            match next {
                NextPage::Fetch(queued) => {
                    tracing::debug!(worker = id, depth = queued.depth, "Processing URL: {}", queued.url);
                    self.process(queued).await;
                    self.notify.notify_waiters();
                }
                NextPage::Wait => notified.await,
                NextPage::Done => {
                    self.notify.notify_waiters();
                    break;
                }
            }
        }
    }

    /// Fetches one page and feeds its links back into the frontier
    async fn process(&self, queued: QueuedUrl) {
        let timeout = Duration::from_millis(self.config.crawl.page_timeout_ms);
        let outcome = fetch_with_retry(
            self.fetcher.as_ref(),
            &queued.url,
            timeout,
            &self.config.retry,
            self.sink.as_ref(),
        )
        .await;

        let failed_attempts = outcome.failed_attempts as usize;

        match outcome.result {
            Err(e) => {
                let record = PageRecord {
                    error: Some(e.to_string()),
                    ..self.blank_record(&queued, PageState::Errored)
                };

                let mut state = self.lock_state();
                state.summary_mut().errors += failed_attempts;
                self.finish(&mut state, &queued.url, record);

                let consecutive = state.record_failure();
                if consecutive >= self.config.retry.max_consecutive_errors {
                    tracing::error!("{} consecutive page failures, aborting crawl", consecutive);
                    state.abort(AbortReason::ErrorBudget);
                }
            }
            Ok(page) => {
                {
                    let mut state = self.lock_state();
                    state.summary_mut().errors += failed_attempts;
                    state.record_success();

                    if self.claim_redirect(&mut state, &queued, &page) == RedirectClaim::AlreadyVisited {
                        tracing::debug!(
                            "{} redirected to already visited {}",
                            queued.url,
                            page.final_url
                        );
                        let record = PageRecord {
                            error: Some(format!("redirects to already visited {}", page.final_url)),
                            ..self.page_record(&queued, &page, PageState::Duplicate, None, 0)
                        };
                        self.finish(&mut state, &queued.url, record);
                        return;
                    }
                }

                if page.is_html() {
                    self.extract_page(&queued, &page);
                } else {
                    tracing::debug!(
                        "Skipping non-HTML page {} ({})",
                        page.final_url,
                        page.content_type.as_deref().unwrap_or("unknown")
                    );
                    let record = self.page_record(&queued, &page, PageState::Skipped, None, 0);
                    self.finish(&mut self.lock_state(), &queued.url, record);
                }
            }
        }
    }

    /// Runs every extractor on an HTML page and enqueues the admitted links
    fn extract_page(&self, queued: &QueuedUrl, page: &PageFetchResult) {
        let outputs = run_extractors(&self.extractors, page);
        self.report_sources(page, &outputs);
        let fused = fuse(&page.final_url, &outputs);
        let admitted = self.admit(&fused);
        self.report_empty(page, &fused, &admitted);

        let extractor_failures = outputs.iter().filter(|o| o.failure.is_some()).count();

        let mut state = self.lock_state();
        {
            let summary = state.summary_mut();
            summary.extractor_failures += extractor_failures;
            summary.links_rejected += fused.rejected;
            summary.links_filtered_by_domain += admitted.out_of_domain;
            summary.links_excluded_by_pattern += admitted.excluded;
        }
        for (link, reason) in &admitted.filtered {
            state.record_filtered(link, reason);
        }

        let enqueued = state.enqueue_links(
            admitted.links,
            queued.depth + 1,
            self.config.crawl.max_depth,
        );

        for link in &enqueued.overflowed {
            self.sink.record(DiagnosticRecord::FrontierOverflow {
                page: queued.url.clone(),
                link: link.clone(),
                max_size: state.frontier().max_size(),
            });
        }
        if !enqueued.overflowed.is_empty()
            && self.config.retry.overflow_policy == OverflowPolicy::Abort
        {
            state.abort(AbortReason::FrontierOverflow);
        }

        let record = self.page_record(
            queued,
            page,
            PageState::Extracted,
            Some(&fused),
            enqueued.queued,
        );
        self.finish(&mut state, &queued.url, record);
    }

    /// Emits one yield record per source, plus failures
    fn report_sources(&self, page: &PageFetchResult, outputs: &[ExtractorOutput]) {
        for output in outputs {
            self.sink.record(DiagnosticRecord::SourceYield {
                page: page.final_url.clone(),
                source: output.source,
                count: output.candidates.len(),
                note: output.note.map(str::to_string),
            });

            if let Some(message) = &output.failure {
                self.sink.record(DiagnosticRecord::ExtractorFailed {
                    page: page.final_url.clone(),
                    source: output.source,
                    message: message.clone(),
                });
            }
        }
    }

    /// Splits fused links by admission outcome
    fn admit(&self, fused: &FusedLinkSet) -> Admitted {
        let mut admitted = Admitted::default();
        for link in &fused.links {
            match self.filter.check(link) {
                Admission::Admitted => admitted.links.push(link.clone()),
                Admission::OutOfDomain => {
                    admitted.out_of_domain += 1;
                    admitted.filtered.push((link.clone(), "out_of_domain".to_string()));
                }
                Admission::Excluded(pattern) => {
                    admitted.excluded += 1;
                    admitted.filtered.push((link.clone(), pattern));
                }
            }
        }
        admitted
    }

    /// Dumps context when a page contributes nothing to the frontier
    fn report_empty(&self, page: &PageFetchResult, fused: &FusedLinkSet, admitted: &Admitted) {
        let accepted_domains: Vec<String> = self.filter.accepted_domains().iter().cloned().collect();

        if fused.is_empty() {
            self.sink.record(DiagnosticRecord::EmptyLinkSet {
                page: page.final_url.clone(),
                host: page.final_url.host_str().unwrap_or_default().to_string(),
                content_size: page.content_size(),
                candidate_count: fused.candidate_count,
                rejected: fused.rejected,
                accepted_domains,
                per_source: fused.per_source.clone(),
            });
        } else if admitted.links.is_empty() {
            self.sink.record(DiagnosticRecord::AllLinksRejected {
                page: page.final_url.clone(),
                fused: fused.len(),
                out_of_domain: admitted.out_of_domain,
                excluded: admitted.excluded,
                accepted_domains,
            });
        }
    }

    /// Claims the normalized redirect target of a fetched page
    fn claim_redirect(
        &self,
        state: &mut CrawlState,
        queued: &QueuedUrl,
        page: &PageFetchResult,
    ) -> RedirectClaim {
        if page.final_url == queued.url {
            return RedirectClaim::Claimed;
        }
        match normalize_url(page.final_url.as_str()) {
            Ok(final_url) => {
                if final_url != queued.url {
                    tracing::debug!("{} redirected to {}", queued.url, final_url);
                }
                state.claim_redirect(&queued.url, final_url)
            }
            Err(_) => RedirectClaim::Claimed,
        }
    }

    fn finish(&self, state: &mut CrawlState, url: &Url, record: PageRecord) {
        if let Err(e) = state.finish_page(url, record) {
            tracing::warn!("Could not record outcome for {}: {}", url, e);
            return;
        }

        let visited = state.summary().pages_visited();
        if visited % PROGRESS_INTERVAL == 0 {
            self.sink.record(DiagnosticRecord::Progress {
                visited,
                max_pages: self.config.crawl.max_pages,
                queued: state.frontier().len(),
            });
        }
    }

    fn blank_record(&self, queued: &QueuedUrl, state: PageState) -> PageRecord {
        PageRecord {
            url: queued.url.to_string(),
            final_url: queued.url.to_string(),
            depth: queued.depth,
            status: None,
            state,
            content: None,
            content_size: 0,
            elapsed_ms: 0,
            links: Default::default(),
            fused_links: 0,
            enqueued_links: 0,
            error: None,
        }
    }

    fn page_record(
        &self,
        queued: &QueuedUrl,
        page: &PageFetchResult,
        state: PageState,
        fused: Option<&FusedLinkSet>,
        enqueued_links: usize,
    ) -> PageRecord {
        PageRecord {
            final_url: page.final_url.to_string(),
            status: page.status,
            content: self
                .config
                .crawl
                .retain_content
                .then(|| page.content.clone()),
            content_size: page.content_size(),
            elapsed_ms: page.elapsed.as_millis() as u64,
            links: fused.map(|f| f.per_source.clone()).unwrap_or_default(),
            fused_links: fused.map_or(0, FusedLinkSet::len),
            enqueued_links,
            ..self.blank_record(queued, state)
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CrawlState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
