//! Links found in a markdown rendering of the page
//!
//! The page is converted to markdown with `htmd`, then scanned with
//! `pulldown-cmark`. Link destinations are collected from link events, and
//! bare `http(s)://` URLs are collected from text outside of links. This
//! catches references that never appear as anchors, such as URLs written out
//! in prose or code blocks.

use super::{ExtractError, LinkExtractor, LinkSource};
use crate::crawler::PageFetchResult;
use pulldown_cmark::{Event, Parser, Tag};
use regex::Regex;
use std::sync::LazyLock;

/// Markdown shorter than this is treated as an empty page
pub const MIN_MARKDOWN_LEN: usize = 100;

static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s\]\)"'<>`]+"#).expect("valid bare URL regex"));

/// Markdown rendering link scanner
#[derive(Debug, Clone, Copy)]
pub struct MarkdownTextExtractor {
    min_length: usize,
}

impl MarkdownTextExtractor {
    pub fn with_min_length(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl Default for MarkdownTextExtractor {
    fn default() -> Self {
        Self::with_min_length(MIN_MARKDOWN_LEN)
    }
}

impl LinkExtractor for MarkdownTextExtractor {
    fn source(&self) -> LinkSource {
        LinkSource::MarkdownText
    }

    fn extract(&self, page: &PageFetchResult) -> Result<Vec<String>, ExtractError> {
        let markdown =
            htmd::convert(&page.content).map_err(|e| ExtractError::Markdown(e.to_string()))?;

        if markdown.trim().len() < self.min_length {
            return Ok(Vec::new());
        }

        Ok(markdown_links(&markdown))
    }
}

/// Collects link destinations and bare URLs from markdown text
pub fn markdown_links(markdown: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut link_depth = 0usize;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Link(_, dest, _)) => {
                link_depth += 1;
                let dest = dest.trim();
                if !dest.is_empty() {
                    links.push(dest.to_string());
                }
            }
            Event::End(Tag::Link(..)) => {
                link_depth = link_depth.saturating_sub(1);
            }
            Event::Text(text) | Event::Code(text) if link_depth == 0 => {
                links.extend(bare_urls(&text));
            }
            _ => {}
        }
    }

    links
}

fn bare_urls(text: &str) -> impl Iterator<Item = String> + '_ {
    BARE_URL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']))
        .filter(|s| s.len() > "https://".len())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tests::page_with;

    const FILLER: &str = "<p>This paragraph exists only so the rendered markdown is long enough to be \
                          considered a real page by the extractor under test.</p>";

    #[test]
    fn test_markdown_link_destinations() {
        let md = "See [docs](/docs) and [blog](https://site.test/blog \"Blog\").";
        assert_eq!(markdown_links(md), vec!["/docs", "https://site.test/blog"]);
    }

    #[test]
    fn test_bare_urls_in_text() {
        let md = "Visit https://site.test/pricing. Or http://site.test/faq, maybe.";
        assert_eq!(
            markdown_links(md),
            vec!["https://site.test/pricing", "http://site.test/faq"]
        );
    }

    #[test]
    fn test_link_text_not_rescanned() {
        let md = "[https://site.test/a](https://site.test/a)";
        assert_eq!(markdown_links(md), vec!["https://site.test/a"]);
    }

    #[test]
    fn test_urls_in_code() {
        let md = "Run `curl https://site.test/api/status` to check.";
        assert_eq!(markdown_links(md), vec!["https://site.test/api/status"]);
    }

    #[test]
    fn test_html_page_converted() {
        let html = format!(
            r#"<html><body>{}<p>Read the <a href="/guide">guide</a> or go to https://site.test/contact</p></body></html>"#,
            FILLER
        );
        let links = MarkdownTextExtractor::default()
            .extract(&page_with(&html, None))
            .unwrap();
        assert!(links.contains(&"/guide".to_string()));
        assert!(links.contains(&"https://site.test/contact".to_string()));
    }

    #[test]
    fn test_short_page_yields_nothing() {
        let html = r#"<a href="/tiny">tiny</a>"#;
        let links = MarkdownTextExtractor::default()
            .extract(&page_with(html, None))
            .unwrap();
        assert!(links.is_empty());

        let links = MarkdownTextExtractor::with_min_length(0)
            .extract(&page_with(html, None))
            .unwrap();
        assert_eq!(links, vec!["/tiny"]);
    }
}
