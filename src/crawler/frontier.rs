//! BFS frontier queue
//!
//! This module handles:
//! - FIFO ordering of pending URLs (insertion order = BFS order)
//! - Deduplication against every URL ever enqueued or visited
//! - Capacity limiting with an overflow counter

use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// The normalized URL to fetch
    pub url: Url,

    /// Link distance from the nearest seed
    pub depth: u32,
}

/// Outcome of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended at the tail
    Queued,
    /// Already queued, in flight or visited
    Duplicate,
    /// Frontier is at capacity; the URL was counted and dropped
    Overflow,
}

/// Bounded FIFO of normalized URLs
///
/// A URL is remembered from the moment it is first queued, so it can never
/// be queued twice, even after it has been popped and fetched.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<QueuedUrl>,
    seen: HashSet<Url>,
    max_size: usize,
    overflowed: usize,
}

impl Frontier {
    /// Creates an empty frontier holding at most `max_size` pending URLs
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            max_size,
            overflowed: 0,
        }
    }

    /// Offers a URL at the given depth
    ///
    /// Duplicates are detected before capacity, so re-discovering a known URL
    /// never counts as an overflow.
    pub fn push(&mut self, url: Url, depth: u32) -> PushOutcome {
        if self.seen.contains(&url) {
            return PushOutcome::Duplicate;
        }

        if self.queue.len() >= self.max_size {
            self.overflowed += 1;
            return PushOutcome::Overflow;
        }

        self.seen.insert(url.clone());
        self.queue.push_back(QueuedUrl { url, depth });
        PushOutcome::Queued
    }

    /// Removes the oldest pending URL
    pub fn pop(&mut self) -> Option<QueuedUrl> {
        self.queue.pop_front()
    }

    /// Records a URL as known without queuing it
    ///
    /// Used for redirect targets: the final URL of a fetched page is already
    /// covered and must not be fetched again. Returns false if it was known.
    pub fn mark_seen(&mut self, url: Url) -> bool {
        self.seen.insert(url)
    }

    /// Drops a URL that is still waiting in the queue
    ///
    /// Returns true if it was pending. The URL stays known.
    pub fn remove_pending(&mut self, url: &Url) -> bool {
        let before = self.queue.len();
        self.queue.retain(|queued| &queued.url != url);
        self.queue.len() != before
    }

    /// Returns true if the URL was ever queued or marked seen
    pub fn contains(&self, url: &Url) -> bool {
        self.seen.contains(url)
    }

    /// Returns the number of pending URLs
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of URLs rejected because the frontier was full
    pub fn overflowed(&self) -> usize {
        self.overflowed
    }
}
