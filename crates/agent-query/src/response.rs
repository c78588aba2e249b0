//! The outbound response contract
//!
//! Every handler answers with one variant of [`Response`]. Serialized, each
//! variant carries its `type` tag, the user-facing text (`analysis` for the two
//! analysis variants, `response` for the rest) and the optional `symbol`,
//! `symbols`, `needsChart` and `data` fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::intent::Intent;

/// A handler's answer, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Comparison {
        response: String,
        symbols: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    TrendAnalysis {
        analysis: String,
        symbol: String,
        #[serde(rename = "needsChart")]
        needs_chart: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    PortfolioAnalysis {
        response: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        symbols: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    MarketOverview {
        response: String,
        symbols: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    Educational {
        response: String,
    },
    CompanyInfo {
        response: String,
        symbol: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    Capability {
        response: String,
    },
    Greeting {
        response: String,
    },
    StandardAnalysis {
        analysis: String,
        symbol: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    NonFinancial {
        response: String,
    },
    DateTime {
        response: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// A question back to the user when an instrument is missing
    Clarification {
        response: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        symbols: Vec<String>,
    },
    /// A downstream failure, named and retryable by the user
    Error {
        response: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        symbol: Option<String>,
    },
}

impl Response {
    /// Build an error response
    pub fn error(response: impl Into<String>, symbol: Option<String>) -> Self {
        Self::Error {
            response: response.into(),
            symbol,
        }
    }

    /// Build a clarification response
    pub fn clarification(response: impl Into<String>, symbols: Vec<String>) -> Self {
        Self::Clarification {
            response: response.into(),
            symbols,
        }
    }

    /// The serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Clarification { .. } => "clarification",
            Self::Error { .. } => "error",
            other => other.intent().map_or("error", |intent| intent.as_str()),
        }
    }

    /// Intent whose handler produced this response
    pub fn intent(&self) -> Option<Intent> {
        let intent = match self {
            Self::Comparison { .. } => Intent::Comparison,
            Self::TrendAnalysis { .. } => Intent::TrendAnalysis,
            Self::PortfolioAnalysis { .. } => Intent::PortfolioAnalysis,
            Self::MarketOverview { .. } => Intent::MarketOverview,
            Self::Educational { .. } => Intent::Educational,
            Self::CompanyInfo { .. } => Intent::CompanyInfo,
            Self::Capability { .. } => Intent::Capability,
            Self::Greeting { .. } => Intent::Greeting,
            Self::StandardAnalysis { .. } => Intent::StandardAnalysis,
            Self::NonFinancial { .. } => Intent::NonFinancial,
            Self::DateTime { .. } => Intent::DateTime,
            Self::Clarification { .. } | Self::Error { .. } => return None,
        };
        Some(intent)
    }

    /// User-facing text
    pub fn text(&self) -> &str {
        match self {
            Self::TrendAnalysis { analysis, .. } | Self::StandardAnalysis { analysis, .. } => {
                analysis
            }
            Self::Comparison { response, .. }
            | Self::PortfolioAnalysis { response, .. }
            | Self::MarketOverview { response, .. }
            | Self::Educational { response }
            | Self::CompanyInfo { response, .. }
            | Self::Capability { response }
            | Self::Greeting { response }
            | Self::NonFinancial { response }
            | Self::DateTime { response, .. }
            | Self::Clarification { response, .. }
            | Self::Error { response, .. } => response,
        }
    }

    /// The singular resolved instrument
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::TrendAnalysis { symbol, .. }
            | Self::CompanyInfo { symbol, .. }
            | Self::StandardAnalysis { symbol, .. } => Some(symbol),
            Self::Error { symbol, .. } => symbol.as_deref(),
            _ => None,
        }
    }

    /// The plural instruments, empty when the variant has none
    pub fn symbols(&self) -> &[String] {
        match self {
            Self::Comparison { symbols, .. }
            | Self::PortfolioAnalysis { symbols, .. }
            | Self::MarketOverview { symbols, .. }
            | Self::Clarification { symbols, .. } => symbols,
            _ => &[],
        }
    }

    /// Whether the chart collaborator should run
    pub fn needs_chart(&self) -> bool {
        matches!(self, Self::TrendAnalysis { needs_chart: true, .. })
    }

    /// Raw market data passed through for formatting
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Comparison { data, .. }
            | Self::TrendAnalysis { data, .. }
            | Self::PortfolioAnalysis { data, .. }
            | Self::MarketOverview { data, .. }
            | Self::CompanyInfo { data, .. }
            | Self::StandardAnalysis { data, .. }
            | Self::DateTime { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    /// Whether this is an error-typed response
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
