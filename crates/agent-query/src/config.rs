//! Configuration for query resolution

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detectors::DEFAULT_PORTFOLIO_WINDOW;
use crate::error::{QueryError, Result};

/// Tunable resolution heuristics
///
/// Both switches were tuned against specific failing queries, so they are
/// exposed as policy instead of being hard-wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionPolicy {
    /// A financial qualifier anywhere in the sentence suppresses the
    /// non-financial classification
    pub financial_qualifier_overrides: bool,

    /// Let the caller's `topic` hint fill in a symbol for vague queries after
    /// the session's last discussed symbol
    pub topic_hint_for_vague_queries: bool,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            financial_qualifier_overrides: true,
            topic_hint_for_vague_queries: false,
        }
    }
}

/// Configuration for the resolver, cache and dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// How long a cached response stays valid
    pub cache_ttl: Duration,

    /// Entry count above which the oldest cached response is evicted
    pub cache_max_entries: usize,

    /// Timeout applied to each analyzer call
    pub analyzer_timeout: Duration,

    /// Verdicts below this confidence are treated as analyzer failures
    pub min_analyzer_confidence: Option<f64>,

    /// Token window used by the portfolio detector
    pub portfolio_window: usize,

    /// Resolution heuristics
    pub policy: ResolutionPolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300), // 5 minutes
            cache_max_entries: 100,
            analyzer_timeout: Duration::from_secs(10),
            min_analyzer_confidence: None,
            portfolio_window: DEFAULT_PORTFOLIO_WINDOW,
            policy: ResolutionPolicy::default(),
        }
    }
}

impl QueryConfig {
    /// Create a new configuration builder
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder::default()
    }

    /// Apply `QUERY_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        QueryConfigBuilder::from(self).with_env_overrides()?.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl.is_zero() {
            return Err(QueryError::ConfigError(
                "cache_ttl must be greater than 0".to_string(),
            ));
        }

        if self.cache_max_entries == 0 {
            return Err(QueryError::ConfigError(
                "cache_max_entries must be greater than 0".to_string(),
            ));
        }

        if self.analyzer_timeout.is_zero() {
            return Err(QueryError::ConfigError(
                "analyzer_timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(confidence) = self.min_analyzer_confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(QueryError::ConfigError(format!(
                    "min_analyzer_confidence must be within 0.0..=1.0, got {confidence}"
                )));
            }
        }

        if self.portfolio_window == 0 {
            return Err(QueryError::ConfigError(
                "portfolio_window must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for QueryConfig
#[derive(Debug, Default)]
pub struct QueryConfigBuilder {
    cache_ttl: Option<Duration>,
    cache_max_entries: Option<usize>,
    analyzer_timeout: Option<Duration>,
    min_analyzer_confidence: Option<f64>,
    portfolio_window: Option<usize>,
    policy: Option<ResolutionPolicy>,
}

impl From<QueryConfig> for QueryConfigBuilder {
    fn from(config: QueryConfig) -> Self {
        Self {
            cache_ttl: Some(config.cache_ttl),
            cache_max_entries: Some(config.cache_max_entries),
            analyzer_timeout: Some(config.analyzer_timeout),
            min_analyzer_confidence: config.min_analyzer_confidence,
            portfolio_window: Some(config.portfolio_window),
            policy: Some(config.policy),
        }
    }
}

impl QueryConfigBuilder {
    /// Set the cache TTL
    pub fn cache_ttl(mut self, duration: Duration) -> Self {
        self.cache_ttl = Some(duration);
        self
    }

    /// Set the maximum number of cached responses
    pub fn cache_max_entries(mut self, entries: usize) -> Self {
        self.cache_max_entries = Some(entries);
        self
    }

    /// Set the analyzer timeout
    pub fn analyzer_timeout(mut self, duration: Duration) -> Self {
        self.analyzer_timeout = Some(duration);
        self
    }

    /// Reject analyzer verdicts below this confidence
    pub fn min_analyzer_confidence(mut self, confidence: f64) -> Self {
        self.min_analyzer_confidence = Some(confidence);
        self
    }

    /// Set the portfolio detector's token window
    pub fn portfolio_window(mut self, window: usize) -> Self {
        self.portfolio_window = Some(window);
        self
    }

    /// Set the resolution policy
    pub fn policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Read `QUERY_CACHE_TTL_SECS`, `QUERY_CACHE_MAX_ENTRIES`,
    /// `QUERY_ANALYZER_TIMEOUT_SECS` and `QUERY_MIN_CONFIDENCE`
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(secs) = env_parse::<u64>("QUERY_CACHE_TTL_SECS")? {
            self.cache_ttl = Some(Duration::from_secs(secs));
        }
        if let Some(entries) = env_parse::<usize>("QUERY_CACHE_MAX_ENTRIES")? {
            self.cache_max_entries = Some(entries);
        }
        if let Some(secs) = env_parse::<u64>("QUERY_ANALYZER_TIMEOUT_SECS")? {
            self.analyzer_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(confidence) = env_parse::<f64>("QUERY_MIN_CONFIDENCE")? {
            self.min_analyzer_confidence = Some(confidence);
        }
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<QueryConfig> {
        let defaults = QueryConfig::default();

        let config = QueryConfig {
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            cache_max_entries: self.cache_max_entries.unwrap_or(defaults.cache_max_entries),
            analyzer_timeout: self.analyzer_timeout.unwrap_or(defaults.analyzer_timeout),
            min_analyzer_confidence: self.min_analyzer_confidence,
            portfolio_window: self.portfolio_window.unwrap_or(defaults.portfolio_window),
            policy: self.policy.unwrap_or(defaults.policy),
        };

        config.validate()?;
        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| QueryError::ConfigError(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(None),
    }
}
