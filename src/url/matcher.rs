/// Checks if a host equals an accepted domain or is one of its subdomains
///
/// Both arguments are expected in lowercase. A leading `*.` on the accepted
/// domain is ignored, so `*.example.com` and `example.com` behave the same.
///
/// # Examples
///
/// ```
/// use site_discovery::url::host_matches;
///
/// assert!(host_matches("example.com", "example.com"));
/// assert!(host_matches("example.com", "blog.example.com"));
/// assert!(host_matches("*.example.com", "api.v2.example.com"));
/// assert!(!host_matches("example.com", "example.org"));
/// assert!(!host_matches("example.com", "notexample.com"));
/// ```
pub fn host_matches(accepted: &str, host: &str) -> bool {
    let base = accepted.strip_prefix("*.").unwrap_or(accepted);
    if base.is_empty() || host.is_empty() {
        return false;
    }

    host == base
        || (host.len() > base.len()
            && host.ends_with(base)
            && host.as_bytes()[host.len() - base.len() - 1] == b'.')
}
