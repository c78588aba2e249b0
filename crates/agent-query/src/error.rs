//! Error types for query resolution and its collaborators

use std::time::Duration;

use thiserror::Error;

/// Crate-level errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Analyzer failure that escaped the resolver boundary
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    /// Market data failure that escaped a handler
    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    /// Prompt template error
    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Failures at the LLM analyzer boundary
///
/// Every variant is recovered by the resolver's fallback path; none reaches
/// the user.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The call did not finish within the configured timeout
    #[error("Analyzer timed out after {0:?}")]
    Timeout(Duration),

    /// Transport-level failure
    #[error("Analyzer request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Analyzer returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The analyzer answered with something that is not a verdict
    #[error("Unexpected analyzer response: {0}")]
    UnexpectedResponse(String),

    /// No analyzer is configured
    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),

    /// The verdict's confidence is below the configured floor
    #[error("Analyzer confidence {confidence:.2} below minimum {minimum:.2}")]
    LowConfidence { confidence: f64, minimum: f64 },
}

impl From<serde_json::Error> for AnalyzerError {
    fn from(err: serde_json::Error) -> Self {
        Self::UnexpectedResponse(err.to_string())
    }
}

impl From<minijinja::Error> for AnalyzerError {
    fn from(err: minijinja::Error) -> Self {
        Self::UnexpectedResponse(format!("prompt rendering failed: {err}"))
    }
}

/// Failures fetching market data
#[derive(Debug, Error)]
pub enum MarketDataError {
    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    Unavailable { symbol: String, reason: String },

    /// The provider answered without a usable price
    #[error("No price available for {0}")]
    NoPrice(String),

    /// Provider-level failure not tied to one symbol
    #[error("Market data provider error: {0}")]
    Provider(String),
}

impl MarketDataError {
    /// Symbol the failure is about, when known
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Unavailable { symbol, .. } | Self::NoPrice(symbol) => Some(symbol),
            Self::Provider(_) => None,
        }
    }
}

impl From<anyhow::Error> for QueryError {
    fn from(err: anyhow::Error) -> Self {
        QueryError::Other(err.to_string())
    }
}
