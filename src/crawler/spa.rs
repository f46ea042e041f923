//! Client-rendering detection for automatic backend selection
//!
//! A page whose navigation is injected by script needs the rendered backend.
//! Detection looks at the static HTML of the first seed only.

use scraper::{Html, Selector};

/// Script `src` fragments produced by common SPA bundlers
const SCRIPT_SRC_PATTERNS: &[&str] = &["_nuxt/", "__next/", "webpack", "vite", "/build/", ".module."];

/// Markup fragments left by SPA frameworks
const MARKUP_PATTERNS: &[(&str, &str)] = &[
    ("_nuxt", "Nuxt"),
    ("__next", "Next.js"),
    ("data-reactroot", "React"),
    ("data-reactid", "React"),
    ("<div id=\"root\">", "React root"),
    ("<div id=\"app\">", "Vue root"),
];

/// Returns a description of the first client-rendering signal found
///
/// Checks, in order: ES module scripts, bundler script paths,
/// `<link rel="modulepreload">`, and framework markers in the raw markup.
pub fn detect_spa(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Ok(sel) = Selector::parse("script[type='module']") {
        let count = document.select(&sel).count();
        if count > 0 {
            return Some(format!("{} ES module script(s)", count));
        }
    }

    if let Ok(sel) = Selector::parse("script[src]") {
        for element in document.select(&sel) {
            let src = element.value().attr("src").unwrap_or_default().to_lowercase();
            if let Some(pattern) = SCRIPT_SRC_PATTERNS.iter().find(|p| src.contains(*p)) {
                return Some(format!("script src matches '{}'", pattern));
            }
        }
    }

    if let Ok(sel) = Selector::parse("link[rel~='modulepreload']") {
        if document.select(&sel).next().is_some() {
            return Some("modulepreload link".to_string());
        }
    }

    let lowered = html.to_lowercase();
    MARKUP_PATTERNS
        .iter()
        .find(|(pattern, _)| lowered.contains(pattern))
        .map(|(pattern, framework)| format!("{} marker '{}'", framework, pattern))
}
