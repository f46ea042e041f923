//! Extractors that read the fetched markup directly
//!
//! # Link Extraction Rules
//!
//! **StaticMarkup includes:**
//! - `<a href="...">` anywhere in the document
//! - `<link rel="canonical" href="...">`
//!
//! **StaticMarkup excludes:**
//! - `<a href="..." download>`
//! - stylesheets, scripts and images
//!
//! **DataAttribute includes** the routing hints client-rendered apps put on
//! arbitrary elements: `data-href`, `data-url`, `data-link`, `routerlink`
//! and `ng-href`.
//!
//! Scheme filtering (`mailto:`, `javascript:`, ...) and relative resolution
//! are left to the normalizer so every source is treated the same way.

use super::{ExtractError, LinkExtractor, LinkSource};
use crate::crawler::PageFetchResult;
use scraper::{Html, Selector};

/// Attributes used as navigation targets by SPA routers
const ROUTING_ATTRIBUTES: &[&str] = &["data-href", "data-url", "data-link", "routerlink", "ng-href"];

/// `<a href>` and canonical links in the fetched (or rendered) HTML
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticMarkupExtractor;

impl LinkExtractor for StaticMarkupExtractor {
    fn source(&self) -> LinkSource {
        LinkSource::StaticMarkup
    }

    fn extract(&self, page: &PageFetchResult) -> Result<Vec<String>, ExtractError> {
        let document = Html::parse_document(&page.content);
        let mut links = Vec::new();

        let anchors = selector("a[href]")?;
        for element in document.select(&anchors) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                links.push(href.to_string());
            }
        }

        let canonical = selector("link[rel='canonical'][href]")?;
        for element in document.select(&canonical) {
            if let Some(href) = element.value().attr("href") {
                links.push(href.to_string());
            }
        }

        Ok(links)
    }
}

/// SPA routing attributes on any element
#[derive(Debug, Clone, Copy, Default)]
pub struct DataAttributeExtractor;

impl LinkExtractor for DataAttributeExtractor {
    fn source(&self) -> LinkSource {
        LinkSource::DataAttribute
    }

    fn extract(&self, page: &PageFetchResult) -> Result<Vec<String>, ExtractError> {
        let document = Html::parse_document(&page.content);
        let mut links = Vec::new();

        for attribute in ROUTING_ATTRIBUTES {
            let sel = selector(&format!("[{}]", attribute))?;
            for element in document.select(&sel) {
                let Some(value) = element.value().attr(attribute) else {
                    continue;
                };
                let value = value.trim();
                if value.is_empty() || value.starts_with('#') {
                    continue;
                }
                links.push(value.to_string());
            }
        }

        Ok(links)
    }
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}
