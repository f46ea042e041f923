use super::{AbortReason, CrawlStatus, PageState};
use crate::crawler::{Frontier, PushOutcome, QueuedUrl};
use crate::output::{CrawlSummary, LinkSamples, PageRecord};
use crate::DiscoveryError;
use std::collections::HashMap;
use url::Url;

/// What a worker should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Fetch this URL
    Fetch(QueuedUrl),
    /// Nothing queued, but pages in flight may still add links
    Wait,
    /// The crawl is over
    Done,
}

/// Result of offering one page's admitted links to the frontier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueReport {
    pub queued: usize,
    pub duplicates: usize,
    pub beyond_depth: usize,
    /// Links dropped because the frontier was full
    pub overflowed: Vec<Url>,
}

/// Whether a fetched page may be processed under its redirect target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectClaim {
    /// No redirect, or the target was not yet known
    Claimed,
    /// The target was already visited or claimed by another page
    AlreadyVisited,
}

/// What a crawl leaves behind once it stops
#[derive(Debug)]
pub struct FinishedCrawl {
    pub pages: Vec<PageRecord>,
    pub summary: CrawlSummary,
    pub samples: LinkSamples,
    pub status: CrawlStatus,
    pub abort_reason: Option<AbortReason>,
}

/// All mutable state of one crawl
///
/// Owned by the coordinator. With several workers it sits behind one mutex;
/// fetching and extraction happen outside the lock.
#[derive(Debug)]
pub struct CrawlState {
    frontier: Frontier,
    visited: HashMap<Url, PageState>,
    /// Redirect targets, mapped to the URL that was fetched
    aliases: HashMap<Url, Url>,
    pages: Vec<PageRecord>,
    summary: CrawlSummary,
    samples: LinkSamples,
    consecutive_errors: u32,
    in_flight: usize,
    status: CrawlStatus,
    abort_reason: Option<AbortReason>,
}

impl CrawlState {
    pub fn new(max_frontier_size: usize) -> Self {
        Self {
            frontier: Frontier::new(max_frontier_size),
            visited: HashMap::new(),
            aliases: HashMap::new(),
            pages: Vec::new(),
            summary: CrawlSummary::default(),
            samples: LinkSamples::default(),
            consecutive_errors: 0,
            in_flight: 0,
            status: CrawlStatus::Running,
            abort_reason: None,
        }
    }

    /// Queues a seed at depth 0
    ///
    /// A seed that does not fit is counted as frontier overflow.
    pub fn seed(&mut self, url: Url) -> PushOutcome {
        let outcome = self.frontier.push(url, 0);
        if outcome == PushOutcome::Overflow {
            self.summary.frontier_overflow += 1;
        }
        outcome
    }

    /// Dequeues the next URL, respecting the page cap
    pub fn next_page(&mut self, max_pages: usize) -> NextPage {
        if self.status.is_finished() || self.visited.len() >= max_pages {
            return NextPage::Done;
        }

        match self.frontier.pop() {
            Some(queued) => {
                self.visited.insert(queued.url.clone(), PageState::Fetching);
                self.in_flight += 1;
                NextPage::Fetch(queued)
            }
            None if self.in_flight > 0 => NextPage::Wait,
            None => NextPage::Done,
        }
    }

    /// Records the terminal outcome of a page that was handed out by `next_page`
    pub fn finish_page(&mut self, url: &Url, record: PageRecord) -> Result<(), DiscoveryError> {
        self.in_flight = self.in_flight.saturating_sub(1);

        let current = self.visited.get(url).copied().unwrap_or(PageState::Queued);
        let next = current.transition(record.state)?;
        self.visited.insert(url.clone(), next);

        match next {
            PageState::Extracted => {
                self.summary.pages_crawled += 1;
                self.summary.add_yields(&record.links);
                if record.fused_links == 0 {
                    self.summary.pages_without_links += 1;
                }
            }
            PageState::Errored => self.summary.pages_errored += 1,
            PageState::Skipped => self.summary.pages_skipped += 1,
            PageState::Duplicate => self.summary.pages_duplicate += 1,
            PageState::Queued | PageState::Fetching => {}
        }

        self.pages.push(record);
        Ok(())
    }

    /// Claims the normalized redirect target of a page handed out by `next_page`
    ///
    /// A target that is still pending is taken out of the frontier, since the
    /// fetched page already covers it. A target that was visited, is in
    /// flight, or was claimed by another redirect makes this page a duplicate.
    pub fn claim_redirect(&mut self, requested: &Url, final_url: Url) -> RedirectClaim {
        if &final_url == requested {
            return RedirectClaim::Claimed;
        }
        if self.visited.contains_key(&final_url) || self.aliases.contains_key(&final_url) {
            return RedirectClaim::AlreadyVisited;
        }

        self.frontier.remove_pending(&final_url);
        self.frontier.mark_seen(final_url.clone());
        self.aliases.insert(final_url, requested.clone());
        RedirectClaim::Claimed
    }

    /// Remembers a fused link that did not pass admission
    pub fn record_filtered(&mut self, url: &Url, reason: &str) {
        self.samples.push_filtered(url, reason);
    }

    /// Offers admitted links found on a page at `depth`
    pub fn enqueue_links(
        &mut self,
        links: impl IntoIterator<Item = Url>,
        depth: u32,
        max_depth: Option<u32>,
    ) -> EnqueueReport {
        let mut report = EnqueueReport::default();

        for link in links {
            if max_depth.is_some_and(|max| depth > max) {
                report.beyond_depth += 1;
                continue;
            }
            match self.frontier.push(link.clone(), depth) {
                PushOutcome::Queued => report.queued += 1,
                PushOutcome::Duplicate => {
                    report.duplicates += 1;
                    self.samples.push_duplicate(&link);
                }
                PushOutcome::Overflow => report.overflowed.push(link),
            }
        }

        self.summary.links_discovered += report.queued;
        self.summary.duplicate_links_skipped += report.duplicates;
        self.summary.links_beyond_depth += report.beyond_depth;
        self.summary.frontier_overflow += report.overflowed.len();
        report
    }

    /// Records a failed page; returns the consecutive failure count
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_errors += 1;
        self.consecutive_errors
    }

    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
    }

    /// Stops the crawl; the first reason wins
    pub fn abort(&mut self, reason: AbortReason) {
        if !self.status.is_finished() {
            self.status = CrawlStatus::Aborted;
            self.abort_reason = Some(reason);
        }
    }

    /// Marks a crawl that ran to its natural end as completed
    pub fn complete(&mut self) {
        if !self.status.is_finished() {
            self.status = CrawlStatus::Completed;
        }
    }

    pub fn summary(&self) -> &CrawlSummary {
        &self.summary
    }

    pub fn summary_mut(&mut self) -> &mut CrawlSummary {
        &mut self.summary
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    /// Number of URLs handed out for fetching
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn page_state(&self, url: &Url) -> Option<PageState> {
        self.visited.get(url).copied()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn status(&self) -> CrawlStatus {
        self.status
    }

    pub fn abort_reason(&self) -> Option<AbortReason> {
        self.abort_reason
    }

    pub fn samples(&self) -> &LinkSamples {
        &self.samples
    }

    /// Consumes the state into its reportable parts
    pub fn finish(self) -> FinishedCrawl {
        FinishedCrawl {
            pages: self.pages,
            summary: self.summary,
            samples: self.samples,
            status: self.status,
            abort_reason: self.abort_reason,
        }
    }
}
