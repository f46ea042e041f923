//! URL handling module for Site-Discovery
//!
//! This module provides URL normalization, domain extraction, subdomain
//! matching, and the domain admission filter applied to fused links.

mod domain;
mod matcher;
mod normalize;

use crate::config::Config;
use crate::ConfigError;
use serde::Serialize;
use std::collections::BTreeSet;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, registrable_domain};
pub use matcher::host_matches;
pub use normalize::{normalize_reference, normalize_url};

/// Outcome of running a URL through the admission filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Host is inside the accepted domain set
    Admitted,
    /// Host is outside every accepted domain
    OutOfDomain,
    /// Host is accepted but the path matched an exclusion pattern
    Excluded(String),
}

impl Admission {
    /// Returns true if the URL may be enqueued
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Domain-scoping gate applied after link fusion
///
/// The accepted set holds the registrable domain of every seed plus the
/// configured extra domains. A URL is admitted when its host equals an
/// accepted domain or is a subdomain of one. The filter never looks at which
/// extractor produced a link.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionFilter {
    accepted: BTreeSet<String>,
    exclude_patterns: Vec<String>,
}

impl AdmissionFilter {
    /// Creates a filter from explicit domains and exclusion patterns
    ///
    /// Domains are lowercased and a leading `*.` is dropped.
    ///
    /// # Returns
    ///
    /// * `Err(ConfigError::EmptyDomainSet)` - no usable domain was given
    pub fn new<D, P>(domains: D, exclude_patterns: P) -> Result<Self, ConfigError>
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let accepted: BTreeSet<String> = domains
            .into_iter()
            .map(|d| {
                let d = d.as_ref().trim().to_lowercase();
                d.strip_prefix("*.").map(str::to_string).unwrap_or(d)
            })
            .filter(|d| !d.is_empty())
            .collect();

        if accepted.is_empty() {
            return Err(ConfigError::EmptyDomainSet);
        }

        let exclude_patterns = exclude_patterns
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(Self {
            accepted,
            exclude_patterns,
        })
    }

    /// Builds the filter for a crawl configuration
    ///
    /// # Returns
    ///
    /// * `Err(ConfigError::NoSeeds)` - the configuration has no seed
    /// * `Err(ConfigError::InvalidUrl)` - a seed cannot be normalized
    /// * `Err(ConfigError::EmptyDomainSet)` - no accepted domain could be derived
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        if config.crawl.seeds.is_empty() {
            return Err(ConfigError::NoSeeds);
        }

        let mut domains = Vec::new();
        for seed in &config.crawl.seeds {
            let url = normalize_url(seed)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", seed, e)))?;
            if let Some(host) = extract_domain(&url) {
                domains.push(registrable_domain(&host));
            }
        }
        domains.extend(config.crawl.extra_domains.iter().cloned());

        Self::new(domains, &config.filter.exclude_patterns)
    }

    /// The accepted domain set, sorted
    pub fn accepted_domains(&self) -> &BTreeSet<String> {
        &self.accepted
    }

    /// Returns true if the host belongs to the accepted domain set
    pub fn accepts_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.accepted.iter().any(|domain| host_matches(domain, &host))
    }

    /// Classifies a normalized URL
    pub fn check(&self, url: &Url) -> Admission {
        let in_domain = url.host_str().map_or(false, |h| self.accepts_host(h));
        if !in_domain {
            return Admission::OutOfDomain;
        }

        // Patterns apply to the path only
        let path = url.path().to_lowercase();
        match self
            .exclude_patterns
            .iter()
            .find(|pattern| path.contains(pattern.as_str()))
        {
            Some(pattern) => Admission::Excluded(pattern.clone()),
            None => Admission::Admitted,
        }
    }

    /// Returns true if the URL may be enqueued
    pub fn admits(&self, url: &Url) -> bool {
        self.check(url).is_admitted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn example_filter() -> AdmissionFilter {
        AdmissionFilter::new(["example.com"], [".pdf"]).unwrap()
    }

    #[test]
    fn test_admits_same_domain() {
        assert!(example_filter().admits(&url("https://example.com/a")));
    }

    #[test]
    fn test_admits_subdomain() {
        assert!(example_filter().admits(&url("https://sub.example.com/a")));
    }

    #[test]
    fn test_rejects_other_domain() {
        assert_eq!(
            example_filter().check(&url("https://example.org/a")),
            Admission::OutOfDomain
        );
    }

    #[test]
    fn test_case_insensitive_domains() {
        let filter = AdmissionFilter::new(["Example.COM"], Vec::<String>::new()).unwrap();
        assert!(filter.accepts_host("WWW.EXAMPLE.com"));
    }

    #[test]
    fn test_exclusion_pattern() {
        assert_eq!(
            example_filter().check(&url("https://example.com/files/report.PDF")),
            Admission::Excluded(".pdf".to_string())
        );
    }

    #[test]
    fn test_exclusion_ignores_host() {
        let mut config = Config::for_seeds(["https://www.docker.com/"], 5);
        config.filter.exclude_patterns = vec![".doc".to_string()];
        let filter = AdmissionFilter::from_config(&config).unwrap();

        assert_eq!(filter.check(&url("https://www.docker.com/pricing")), Admission::Admitted);
        assert_eq!(filter.check(&url("https://docs.docker.com/engine")), Admission::Admitted);
        assert_eq!(
            filter.check(&url("https://docs.docker.com/files/guide.doc")),
            Admission::Excluded(".doc".to_string())
        );
    }

    #[test]
    fn test_out_of_domain_wins_over_exclusion() {
        assert_eq!(
            example_filter().check(&url("https://example.org/report.pdf")),
            Admission::OutOfDomain
        );
    }

    #[test]
    fn test_empty_domain_set_rejected() {
        let result = AdmissionFilter::new(Vec::<String>::new(), Vec::<String>::new());
        assert!(matches!(result, Err(ConfigError::EmptyDomainSet)));
    }

    #[test]
    fn test_from_config_uses_registrable_seed_domain() {
        let mut config = Config::for_seeds(["https://www.site.test/start"], 5);
        config.crawl.extra_domains = vec!["*.partner.test".to_string()];

        let filter = AdmissionFilter::from_config(&config).unwrap();
        let domains: Vec<&str> = filter.accepted_domains().iter().map(String::as_str).collect();
        assert_eq!(domains, vec!["partner.test", "site.test"]);

        assert!(filter.admits(&url("https://blog.site.test/")));
        assert!(filter.admits(&url("https://partner.test/")));
        assert!(!filter.admits(&url("https://elsewhere.test/")));
    }

    #[test]
    fn test_from_config_without_seeds() {
        let config = Config::for_seeds(Vec::<String>::new(), 5);
        assert!(matches!(
            AdmissionFilter::from_config(&config),
            Err(ConfigError::NoSeeds)
        ));
    }
}
