//! Query intents and the handler names they dispatch to

use std::fmt;

use serde::{Deserialize, Serialize};

/// The classified purpose of a user query
///
/// Each intent maps to exactly one handler; the serialized label doubles as the
/// `type` tag of the handler's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Side-by-side comparison of two or more instruments
    Comparison,
    /// Price trend, usually with a chart
    TrendAnalysis,
    /// Review of the user's own holdings
    PortfolioAnalysis,
    /// Broad market snapshot
    MarketOverview,
    /// Explanation of a financial concept
    Educational,
    /// Background on a company behind a ticker
    CompanyInfo,
    /// "What can you do?"
    Capability,
    /// Greetings and small talk
    Greeting,
    /// Default single-instrument analysis
    StandardAnalysis,
    /// Out-of-domain question
    NonFinancial,
    /// Current date, time or market hours
    DateTime,
}

impl Intent {
    /// Every intent, in handler-table order
    pub const ALL: [Intent; 11] = [
        Self::Comparison,
        Self::TrendAnalysis,
        Self::PortfolioAnalysis,
        Self::MarketOverview,
        Self::Educational,
        Self::CompanyInfo,
        Self::Capability,
        Self::Greeting,
        Self::StandardAnalysis,
        Self::NonFinancial,
        Self::DateTime,
    ];

    /// Stable snake_case label, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comparison => "comparison",
            Self::TrendAnalysis => "trend_analysis",
            Self::PortfolioAnalysis => "portfolio_analysis",
            Self::MarketOverview => "market_overview",
            Self::Educational => "educational",
            Self::CompanyInfo => "company_info",
            Self::Capability => "capability",
            Self::Greeting => "greeting",
            Self::StandardAnalysis => "standard_analysis",
            Self::NonFinancial => "non_financial",
            Self::DateTime => "date_time",
        }
    }

    /// Parse a label produced by an analyzer
    ///
    /// Accepts the canonical labels plus the loose variants language models
    /// tend to emit ("trend", "price", "off_topic", "datetime"). Returns `None`
    /// for anything unrecognized.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace(['-', ' '], "_");

        let intent = match normalized.as_str() {
            "comparison" | "compare" => Self::Comparison,
            "trend_analysis" | "trend" | "chart" | "technical_analysis" => Self::TrendAnalysis,
            "portfolio_analysis" | "portfolio" => Self::PortfolioAnalysis,
            "market_overview" | "market" | "overview" => Self::MarketOverview,
            "educational" | "education" | "explain" => Self::Educational,
            "company_info" | "company" | "company_information" => Self::CompanyInfo,
            "capability" | "capabilities" | "help" => Self::Capability,
            "greeting" | "small_talk" => Self::Greeting,
            "standard_analysis" | "standard" | "analysis" | "price" | "price_query" => {
                Self::StandardAnalysis
            }
            "non_financial" | "nonfinancial" | "off_topic" => Self::NonFinancial,
            "date_time" | "datetime" | "time" | "date" => Self::DateTime,
            _ => return None,
        };

        Some(intent)
    }

    /// Minimum number of symbols the handler needs
    ///
    /// A resolution with fewer symbols produces a clarification response.
    pub fn min_symbols(&self) -> usize {
        match self {
            Self::Comparison => 2,
            Self::TrendAnalysis | Self::StandardAnalysis | Self::CompanyInfo => 1,
            _ => 0,
        }
    }

    /// Whether the handler cannot run without at least one symbol
    pub fn requires_symbol(&self) -> bool {
        self.min_symbols() > 0
    }

    /// Intents that stand on their own even when the analyzer says the query is
    /// not financial
    pub fn is_conversational(&self) -> bool {
        matches!(self, Self::Greeting | Self::Capability | Self::DateTime)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_matches_serde() {
        for intent in Intent::ALL {
            let json = serde_json::to_string(&intent).unwrap();
            assert_eq!(json, format!("\"{}\"", intent.as_str()));
        }
    }

    #[test]
    fn test_from_label_aliases() {
        assert_eq!(Intent::from_label("trend"), Some(Intent::TrendAnalysis));
        assert_eq!(Intent::from_label("Trend Analysis"), Some(Intent::TrendAnalysis));
        assert_eq!(Intent::from_label("market-overview"), Some(Intent::MarketOverview));
        assert_eq!(Intent::from_label("datetime"), Some(Intent::DateTime));
        assert_eq!(Intent::from_label("off_topic"), Some(Intent::NonFinancial));
        assert_eq!(Intent::from_label("astrology"), None);
    }

    #[test]
    fn test_symbol_requirements() {
        assert_eq!(Intent::Comparison.min_symbols(), 2);
        assert!(Intent::TrendAnalysis.requires_symbol());
        assert!(Intent::CompanyInfo.requires_symbol());
        assert!(!Intent::MarketOverview.requires_symbol());
        assert!(!Intent::PortfolioAnalysis.requires_symbol());
        assert!(!Intent::Greeting.requires_symbol());
    }
}
