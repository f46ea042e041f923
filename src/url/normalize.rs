use crate::UrlError;
use url::Url;

/// Tracking query parameters removed during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes an absolute URL string
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP(S)
/// 3. Lowercase the host (default ports are dropped by the parser)
/// 4. Normalize path:
///    - Remove dot segments and empty segments
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment
/// 6. Remove tracking query parameters and sort the rest
/// 7. Remove empty query string
///
/// The result is idempotent: normalizing a normalized URL returns it unchanged.
///
/// # Examples
///
/// ```
/// use site_discovery::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/a/").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(url)
}

/// Resolves a raw reference found on `base` and normalizes the result
///
/// Relative references are resolved against the page they were found on.
/// Empty and fragment-only references are rejected, as are non-HTTP schemes
/// such as `mailto:`, `javascript:`, `tel:` and `data:`.
///
/// # Examples
///
/// ```
/// use site_discovery::url::normalize_reference;
/// use url::Url;
///
/// let base = Url::parse("https://site.test/docs/intro").unwrap();
/// let url = normalize_reference("../about/#team", &base).unwrap();
/// assert_eq!(url.as_str(), "https://site.test/about");
/// assert!(normalize_reference("mailto:hi@site.test", &base).is_err());
/// ```
pub fn normalize_reference(raw: &str, base: &Url) -> Result<Url, UrlError> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(UrlError::Empty);
    }

    if raw.starts_with('#') {
        return Err(UrlError::FragmentOnly(raw.to_string()));
    }

    let joined = base
        .join(raw)
        .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    canonicalize(joined)
}

/// Applies the canonical form to an already parsed URL
fn canonicalize(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => return Err(UrlError::MissingDomain),
    };
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments, empty segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
