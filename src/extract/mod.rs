//! Link extraction and fusion
//!
//! Every fetched page is scanned by five independent extractors, each reading
//! a different signal:
//! - static markup anchors (`<a href>`, canonical links)
//! - anchors reported by the render engine after a full render
//! - routing attributes used by client-rendered apps (`data-href`, ...)
//! - hrefs collected by an in-page script walking the live DOM
//! - links in a markdown rendering of the page
//!
//! All extractors run for every page; none is skipped because another one
//! already produced links. An extractor failure (error or panic) is contained
//! and reported as zero links from that source.

mod fusion;
mod markdown;
mod markup;
mod rendered;

use crate::crawler::PageFetchResult;
use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use url::Url;

pub use fusion::{fuse, FusedLinkSet, SourceYield};
pub use markdown::MarkdownTextExtractor;
pub use markup::{DataAttributeExtractor, StaticMarkupExtractor};
pub use rendered::{RenderedDomExtractor, ScriptCollectedExtractor};

/// Identity of a link source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkSource {
    /// `<a href>` and canonical links in the fetched markup
    StaticMarkup,
    /// Anchors the render engine reports from the live DOM
    RenderedDom,
    /// SPA routing attributes such as `data-href`
    DataAttribute,
    /// Hrefs returned by an in-page DOM walking script
    ScriptCollected,
    /// Links found in a markdown rendering of the page
    MarkdownText,
}

impl LinkSource {
    /// All sources, in reporting order
    pub const ALL: [LinkSource; 5] = [
        LinkSource::StaticMarkup,
        LinkSource::RenderedDom,
        LinkSource::DataAttribute,
        LinkSource::ScriptCollected,
        LinkSource::MarkdownText,
    ];

    /// Name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::StaticMarkup => "StaticMarkup",
            Self::RenderedDom => "RenderedDom",
            Self::DataAttribute => "DataAttribute",
            Self::ScriptCollected => "ScriptCollected",
            Self::MarkdownText => "MarkdownText",
        }
    }
}

impl fmt::Display for LinkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised inside a single extractor
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Unexpected script result: {0}")]
    ScriptResult(String),

    #[error("Markdown rendering failed: {0}")]
    Markdown(String),

    #[error("Extractor panicked: {0}")]
    Panicked(String),
}

/// A raw reference found on a page, tagged with its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    /// The reference exactly as found (may be relative)
    pub raw: String,
    /// Which extractor produced it
    pub source: LinkSource,
    /// The page it was found on
    pub origin: Url,
}

/// A link extraction strategy
///
/// Implementations are pure functions over the fetched page. They return raw
/// references; normalization and domain admission happen later, after fusion.
pub trait LinkExtractor: Send + Sync {
    /// The source identity reported for this extractor's links
    fn source(&self) -> LinkSource;

    /// Whether this extractor only sees links when the page was rendered
    fn requires_render(&self) -> bool {
        false
    }

    /// Scans the page and returns raw references
    fn extract(&self, page: &PageFetchResult) -> Result<Vec<String>, ExtractError>;
}

/// What one extractor produced for one page
#[derive(Debug, Clone)]
pub struct ExtractorOutput {
    pub source: LinkSource,
    pub candidates: Vec<LinkCandidate>,
    /// Set when the extractor failed; `candidates` is then empty
    pub failure: Option<String>,
    /// Explanation for an expected empty result
    pub note: Option<&'static str>,
}

/// Returns the standard set of five extractors
pub fn default_extractors() -> Vec<Box<dyn LinkExtractor>> {
    vec![
        Box::new(StaticMarkupExtractor),
        Box::new(RenderedDomExtractor),
        Box::new(DataAttributeExtractor),
        Box::new(ScriptCollectedExtractor),
        Box::new(MarkdownTextExtractor::default()),
    ]
}

/// Runs every extractor against the page
///
/// Each extractor is isolated: an `Err` or a panic becomes an output with no
/// candidates and a failure message, and the remaining extractors still run.
pub fn run_extractors(
    extractors: &[Box<dyn LinkExtractor>],
    page: &PageFetchResult,
) -> Vec<ExtractorOutput> {
    extractors
        .iter()
        .map(|extractor| run_one(extractor.as_ref(), page))
        .collect()
}

fn run_one(extractor: &dyn LinkExtractor, page: &PageFetchResult) -> ExtractorOutput {
    let source = extractor.source();
    let note = if extractor.requires_render() && page.rendered.is_none() {
        Some("backend provides no rendered page")
    } else {
        None
    };

    let result = catch_unwind(AssertUnwindSafe(|| extractor.extract(page)))
        .unwrap_or_else(|payload| Err(ExtractError::Panicked(panic_message(payload.as_ref()))));

    match result {
        Ok(links) => ExtractorOutput {
            source,
            candidates: links
                .into_iter()
                .map(|raw| LinkCandidate {
                    raw,
                    source,
                    origin: page.final_url.clone(),
                })
                .collect(),
            failure: None,
            note,
        },
        Err(e) => ExtractorOutput {
            source,
            candidates: Vec::new(),
            failure: Some(e.to_string()),
            note,
        },
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
