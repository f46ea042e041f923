use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two crawl reports can be tied to the exact
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendKind, OverflowPolicy};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawl]
seeds = ["https://example.com/"]
max-pages = 50
extra-domains = ["cdn.example.net"]
backend = "rendered"
page-timeout-ms = 5000
max-frontier-size = 200
max-depth = 3
workers = 4

[retry]
max-retries = 1
overflow-policy = "abort"

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawl.max_pages, 50);
        assert_eq!(config.crawl.backend, BackendKind::Rendered);
        assert_eq!(config.crawl.max_depth, Some(3));
        assert_eq!(config.crawl.workers, 4);
        assert_eq!(config.crawl.extra_domains, vec!["cdn.example.net"]);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.overflow_policy, OverflowPolicy::Abort);
        assert_eq!(config.user_agent.crawler_name, "TestCrawler");
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config(
            r#"
[crawl]
seeds = ["https://example.com/"]
max-pages = 10
"#,
        )
        .unwrap();

        assert_eq!(config.crawl.backend, BackendKind::Static);
        assert_eq!(config.crawl.workers, 1);
        assert_eq!(config.crawl.max_frontier_size, 5_000);
        assert_eq!(config.crawl.max_depth, None);
        assert!(!config.crawl.retain_content);
        assert_eq!(config.retry.overflow_policy, OverflowPolicy::Drop);
        assert!(config
            .filter
            .exclude_patterns
            .contains(&".pdf".to_string()));
        assert!(config.render.scroll);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_without_seeds() {
        let result = parse_config(
            r#"
[crawl]
seeds = []
max-pages = 10
"#,
        );
        assert!(matches!(result, Err(ConfigError::NoSeeds)));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = parse_config(
            r#"
[crawl]
seeds = ["https://example.com/"]
max-pages = 10
backend = "telepathy"
"#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
