use super::{ExtractorOutput, LinkSource};
use crate::url::normalize_reference;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// How much one source contributed to a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceYield {
    /// References returned by the extractor, before normalization
    pub raw: usize,
    /// Distinct normalized links among them
    pub unique: usize,
}

/// Deduplicated links for one page with per-source accounting
#[derive(Debug, Clone, Default)]
pub struct FusedLinkSet {
    /// Normalized links in first-seen order
    pub links: Vec<Url>,
    pub per_source: BTreeMap<LinkSource, SourceYield>,
    /// Candidates across all sources, before union
    pub candidate_count: usize,
    /// Candidates the normalizer rejected (bad scheme, fragment-only, ...)
    pub rejected: usize,
}

impl FusedLinkSet {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Largest distinct contribution of any single source
    pub fn max_single_source(&self) -> usize {
        self.per_source.values().map(|y| y.unique).max().unwrap_or(0)
    }
}

/// Unions every extractor's output for a page
///
/// Each raw reference is resolved against `base` (the page's final URL) and
/// normalized once. Sources are walked in the order given, so the resulting
/// link order is stable for a fixed extractor list.
pub fn fuse(base: &Url, outputs: &[ExtractorOutput]) -> FusedLinkSet {
    let mut fused = FusedLinkSet::default();
    let mut seen: HashSet<Url> = HashSet::new();

    for output in outputs {
        let mut distinct: HashSet<Url> = HashSet::new();

        for candidate in &output.candidates {
            fused.candidate_count += 1;
            match normalize_reference(&candidate.raw, base) {
                Ok(url) => {
                    distinct.insert(url.clone());
                    if seen.insert(url.clone()) {
                        fused.links.push(url);
                    }
                }
                Err(_) => fused.rejected += 1,
            }
        }

        let entry = fused.per_source.entry(output.source).or_default();
        entry.raw += output.candidates.len();
        entry.unique += distinct.len();
    }

    fused
}
