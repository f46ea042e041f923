/// Page and crawl state definitions
///
/// A page moves `Queued → Fetching → {Extracted | Errored | Skipped | Duplicate}`. The
/// crawl as a whole moves `Running → {Completed | Aborted}`.
use crate::DiscoveryError;
use serde::Serialize;
use std::fmt;

/// Represents the current state of a page in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    // ===== Active States =====
    /// Page is waiting in the frontier
    Queued,

    /// Page is currently being fetched
    Fetching,

    // ===== Terminal States =====
    /// Page was fetched and its links extracted
    Extracted,

    /// Fetch failed after all retries
    Errored,

    /// Page was fetched but is not HTML
    Skipped,

    /// Page redirected to a URL that was already visited
    Duplicate,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if this is an active state (page may still be processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Fetching)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Extracted)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Errored)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Fetching)
                | (Self::Fetching, Self::Extracted)
                | (Self::Fetching, Self::Errored)
                | (Self::Fetching, Self::Skipped)
                | (Self::Fetching, Self::Duplicate)
        )
    }

    /// Moves to `next`, rejecting illegal transitions
    pub fn transition(self, next: PageState) -> Result<PageState, DiscoveryError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DiscoveryError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Extracted => "extracted",
            Self::Errored => "errored",
            Self::Skipped => "skipped",
            Self::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a crawl stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Too many consecutive fetch failures
    ErrorBudget,
    /// Frontier hit its maximum under the abort overflow policy
    FrontierOverflow,
    /// The global crawl deadline passed
    Deadline,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ErrorBudget => "consecutive error budget exceeded",
            Self::FrontierOverflow => "frontier overflow",
            Self::Deadline => "crawl deadline reached",
        };
        f.write_str(s)
    }
}

/// Crawl-level status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    #[default]
    Running,
    /// Frontier drained or page cap reached
    Completed,
    Aborted,
}

impl CrawlStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}
