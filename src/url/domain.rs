use std::net::IpAddr;
use url::Url;

/// Second-level labels that sit under a two-letter country code (`co.uk`, `com.au`, ...)
const COUNTRY_SECOND_LEVEL: &[&str] = &[
    "ac", "co", "com", "edu", "gov", "go", "ne", "net", "or", "org",
];

/// Extracts the domain from a URL
///
/// Returns the lowercase host, or `None` if the URL has no host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_discovery::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Reduces a host to its registrable domain
///
/// Keeps the last two labels, or three when the host ends in a country-code
/// second-level pair such as `co.uk`. IP addresses and single-label hosts are
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use site_discovery::url::registrable_domain;
///
/// assert_eq!(registrable_domain("www.example.com"), "example.com");
/// assert_eq!(registrable_domain("shop.example.co.uk"), "example.co.uk");
/// assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
/// ```
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();

    if host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
        return host;
    }

    let labels: Vec<&str> = host.split('.').collect();
    let n = labels.len();
    if n <= 2 {
        return host;
    }

    let keep = if labels[n - 1].len() == 2 && COUNTRY_SECOND_LEVEL.contains(&labels[n - 2]) {
        3
    } else {
        2
    };

    labels[n.saturating_sub(keep)..].join(".")
}
