use crate::config::types::{Config, CrawlConfig, FilterConfig, RetryConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_retry_config(&config.retry)?;
    validate_filter_config(&config.filter)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates seeds, limits and extra domains
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.seeds.is_empty() {
        return Err(ConfigError::NoSeeds);
    }

    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if config.max_frontier_size < 1 {
        return Err(ConfigError::Validation(
            "max_frontier_size must be >= 1".to_string(),
        ));
    }

    if config.seeds.len() > config.max_frontier_size {
        return Err(ConfigError::Validation(format!(
            "{} seeds do not fit in a frontier of {}",
            config.seeds.len(),
            config.max_frontier_size
        )));
    }

    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.page_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "page_timeout_ms must be >= 100ms, got {}ms",
            config.page_timeout_ms
        )));
    }

    if config.crawl_deadline_secs == Some(0) {
        return Err(ConfigError::Validation(
            "crawl_deadline_secs must be > 0 when set".to_string(),
        ));
    }

    for domain in &config.extra_domains {
        validate_domain_pattern(domain)?;
    }

    Ok(())
}

/// Validates a single seed URL
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            seed
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

/// Validates backoff bounds and error budget
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.base_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "base_delay_ms ({}) cannot exceed max_delay_ms ({})",
            config.base_delay_ms, config.max_delay_ms
        )));
    }

    if config.max_consecutive_errors < 1 {
        return Err(ConfigError::Validation(
            "max_consecutive_errors must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates exclusion patterns
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    if config.exclude_patterns.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::InvalidPattern(
            "exclude pattern cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates a domain pattern (an optional `*.` prefix is tolerated)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    validate_domain_string(domain)
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
