//! Extractors that read what the render engine reported
//!
//! Both sources are empty when the page came from the static backend.

use super::{ExtractError, LinkExtractor, LinkSource};
use crate::crawler::PageFetchResult;
use serde_json::Value;

/// Anchors the render engine listed from the live DOM
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderedDomExtractor;

impl LinkExtractor for RenderedDomExtractor {
    fn source(&self) -> LinkSource {
        LinkSource::RenderedDom
    }

    fn requires_render(&self) -> bool {
        true
    }

    fn extract(&self, page: &PageFetchResult) -> Result<Vec<String>, ExtractError> {
        Ok(page
            .rendered
            .as_ref()
            .map(|snapshot| snapshot.dom_links.clone())
            .unwrap_or_default())
    }
}

/// Hrefs returned by the in-page DOM walking script
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptCollectedExtractor;

impl LinkExtractor for ScriptCollectedExtractor {
    fn source(&self) -> LinkSource {
        LinkSource::ScriptCollected
    }

    fn requires_render(&self) -> bool {
        true
    }

    fn extract(&self, page: &PageFetchResult) -> Result<Vec<String>, ExtractError> {
        match page.rendered.as_ref().and_then(|s| s.script_result.as_ref()) {
            Some(value) => links_from_script_value(value),
            None => Ok(Vec::new()),
        }
    }
}

/// Reads the script result
///
/// Accepts an array of strings, or an object whose first array-valued field
/// holds the strings. `null` means the script produced nothing. Only values
/// that look navigable (`http...` or root-relative) are kept.
fn links_from_script_value(value: &Value) -> Result<Vec<String>, ExtractError> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        Value::Object(map) => match map.values().find_map(Value::as_array) {
            Some(items) => items,
            None => {
                return Err(ExtractError::ScriptResult(
                    "object without an array field".to_string(),
                ))
            }
        },
        other => {
            return Err(ExtractError::ScriptResult(format!(
                "expected array, got {}",
                type_name(other)
            )))
        }
    };

    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| s.starts_with("http") || s.starts_with('/'))
        .map(str::to_string)
        .collect())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::RenderedSnapshot;
    use crate::extract::tests::page_with;
    use serde_json::json;

    fn snapshot(dom_links: &[&str], script_result: Option<Value>) -> Option<RenderedSnapshot> {
        Some(RenderedSnapshot {
            dom_links: dom_links.iter().map(|s| s.to_string()).collect(),
            script_result,
        })
    }

    #[test]
    fn test_dom_links_passed_through() {
        let page = page_with("", snapshot(&["https://site.test/a", "/b"], None));
        assert_eq!(
            RenderedDomExtractor.extract(&page).unwrap(),
            vec!["https://site.test/a", "/b"]
        );
    }

    #[test]
    fn test_static_page_yields_nothing() {
        let page = page_with(r#"<a href="/a">A</a>"#, None);
        assert!(RenderedDomExtractor.extract(&page).unwrap().is_empty());
        assert!(ScriptCollectedExtractor.extract(&page).unwrap().is_empty());
    }

    #[test]
    fn test_script_array_result() {
        let page = page_with(
            "",
            snapshot(&[], Some(json!(["https://site.test/x", "/y", "javascript:void(0)", "relative", 7]))),
        );
        assert_eq!(
            ScriptCollectedExtractor.extract(&page).unwrap(),
            vec!["https://site.test/x", "/y"]
        );
    }

    #[test]
    fn test_script_object_result() {
        let page = page_with(
            "",
            snapshot(&[], Some(json!({"count": 2, "links": ["/one", "/two"]}))),
        );
        assert_eq!(
            ScriptCollectedExtractor.extract(&page).unwrap(),
            vec!["/one", "/two"]
        );
    }

    #[test]
    fn test_script_unexpected_shape_is_error() {
        let page = page_with("", snapshot(&[], Some(json!("just a string"))));
        assert!(matches!(
            ScriptCollectedExtractor.extract(&page),
            Err(ExtractError::ScriptResult(_))
        ));

        let page = page_with("", snapshot(&[], Some(json!({"count": 0}))));
        assert!(ScriptCollectedExtractor.extract(&page).is_err());
    }

    #[test]
    fn test_script_null_result() {
        let page = page_with("", snapshot(&["/dom"], Some(Value::Null)));
        assert!(ScriptCollectedExtractor.extract(&page).unwrap().is_empty());
    }
}
