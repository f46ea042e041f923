use serde::{Deserialize, Serialize};

/// Main configuration structure for Site-Discovery
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Crawl scope and limits
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// BFS starting points (depth 0)
    pub seeds: Vec<String>,

    /// Hard cap on the number of visited pages
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Domains accepted in addition to the seeds' registrable domains
    #[serde(rename = "extra-domains", default)]
    pub extra_domains: Vec<String>,

    /// Which fetch backend drives the crawl
    #[serde(default)]
    pub backend: BackendKind,

    /// Per-page fetch timeout (milliseconds)
    #[serde(rename = "page-timeout-ms", default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// Maximum number of URLs waiting in the frontier
    #[serde(rename = "max-frontier-size", default = "default_max_frontier_size")]
    pub max_frontier_size: usize,

    /// Optional BFS depth cap; unset means unlimited
    #[serde(rename = "max-depth", default)]
    pub max_depth: Option<u32>,

    /// Number of concurrent fetch workers (1 = strict BFS order)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Global deadline for the whole crawl (seconds)
    #[serde(rename = "crawl-deadline-secs", default)]
    pub crawl_deadline_secs: Option<u64>,

    /// Keep page content in the final report
    #[serde(rename = "retain-content", default)]
    pub retain_content: bool,
}

/// Fetch backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Plain HTTP fetch, markup parsing only
    #[default]
    Static,
    /// Headless browser render
    Rendered,
    /// Probe the first seed and pick a backend
    Auto,
}

/// Retry, error budget and overflow behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first failed attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay (milliseconds)
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on a single backoff delay (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Consecutive failed pages tolerated before the crawl aborts
    #[serde(rename = "max-consecutive-errors", default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// What happens when an admitted link does not fit in the frontier
    #[serde(rename = "overflow-policy", default)]
    pub overflow_policy: OverflowPolicy,
}

/// Frontier overflow handling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Count the rejected link and keep crawling
    #[default]
    Drop,
    /// Abort the crawl on the first rejected link
    Abort,
}

/// Link exclusion rules applied alongside domain admission
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Substrings of the URL path that exclude it (matched case-insensitively)
    #[serde(rename = "exclude-patterns", default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email", default)]
    pub contact_email: Option<String>,
}

/// Headless rendering options
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Explicit Chrome/Chromium binary; auto-detected when unset
    #[serde(rename = "chrome-executable", default)]
    pub chrome_executable: Option<String>,

    /// Extra wait after the document reports ready (milliseconds)
    #[serde(rename = "settle-ms", default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Scroll to the bottom and back to force lazy content
    #[serde(default = "default_true")]
    pub scroll: bool,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version (+ContactURL; ContactEmail)`, with the
    /// parenthesised part omitted when no contact details are configured.
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = self
            .contact_url
            .iter()
            .map(|u| format!("+{}", u))
            .chain(self.contact_email.iter().cloned())
            .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_consecutive_errors: default_max_consecutive_errors(),
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SiteDiscovery".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            settle_ms: default_settle_ms(),
            scroll: true,
        }
    }
}

impl Config {
    /// Builds a configuration for the given seeds with every other option at its default
    pub fn for_seeds<I, S>(seeds: I, max_pages: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            crawl: CrawlConfig {
                seeds: seeds.into_iter().map(Into::into).collect(),
                max_pages,
                extra_domains: Vec::new(),
                backend: BackendKind::Static,
                page_timeout_ms: default_page_timeout_ms(),
                max_frontier_size: default_max_frontier_size(),
                max_depth: None,
                workers: default_workers(),
                crawl_deadline_secs: None,
                retain_content: false,
            },
            retry: RetryConfig::default(),
            filter: FilterConfig::default(),
            user_agent: UserAgentConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

fn default_page_timeout_ms() -> u64 {
    15_000
}

fn default_max_frontier_size() -> usize {
    5_000
}

fn default_workers() -> usize {
    1
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}

fn default_max_consecutive_errors() -> u32 {
    10
}

fn default_settle_ms() -> u64 {
    1_000
}

fn default_true() -> bool {
    true
}

fn default_exclude_patterns() -> Vec<String> {
    [".pdf", ".jpg", ".jpeg", ".png", ".gif", ".zip", ".doc", ".docx"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}
