//! Deterministic intent rules for the fallback path
//!
//! Rules are an ordered list of `(name, predicate, intent)` entries evaluated
//! first-match-wins. The list lives outside the resolver so each rule can be
//! exercised on its own.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::QueryConfig;
use crate::detectors::{NonFinancialDetector, PortfolioDetector};
use crate::glossary;
use crate::intent::Intent;

/// Everything a rule predicate may look at
#[derive(Debug, Clone)]
pub struct RuleInput<'a> {
    /// Raw query text
    pub text: &'a str,
    /// Lower-cased query text
    pub lower: String,
    /// Symbols extracted from the query
    pub symbols: &'a [String],
    /// Result of the non-financial detector
    pub non_financial: bool,
    /// Result of the portfolio detector
    pub portfolio: bool,
}

/// A single classification rule
#[derive(Debug, Clone, Copy)]
pub struct IntentRule {
    /// Rule name, for logs and tests
    pub name: &'static str,
    /// Intent produced when the predicate matches
    pub intent: Intent,
    /// The predicate itself
    pub matches: fn(&RuleInput<'_>) -> bool,
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid intent rule regex")
}

static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    regex(concat!(
        r"\b(?:what time|current time|time is it|what(?:'s|s| is) the date|today'?s date|",
        r"date today|what day is|which day is|what year is|market hours|trading hours|",
        r"is the (?:stock )?market open|market (?:open|closed) today|",
        r"when does the (?:stock )?market (?:open|close))\b"
    ))
});

// The greeting must be the whole message, give or take filler words
static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    regex(concat!(
        r"^(?:hi|hello|hey|hiya|yo|howdy|greetings|sup|what'?s up|good (?:morning|afternoon|evening)|",
        r"thanks|thank you|cheers)",
        r"(?:[\s,!.]+(?:hi|hello|hey|thanks|thank you|cheers|there|again|all|everyone|bot|buddy|",
        r"friend|mate|folks|guys|team|so much|a lot|very much))*[\s,!.?]*$"
    ))
});

static CAPABILITY: LazyLock<Regex> = LazyLock::new(|| {
    regex(concat!(
        r"^(?:help|commands|menu)\W*$|\b(?:what can you do|what can you help|what do you do|",
        r"how do you work|who are you|what are you|your capabilities|what can i ask)\b"
    ))
});

static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"\b(?:vs\.?|versus|compare|compared|comparing|comparison|against|better than|head to head)\b")
});

static WHICH_IS_BETTER: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\bwhich\b.*\b(?:better|best|stronger|safer)\b|\bor\b"));

static TREND: LazyLock<Regex> = LazyLock::new(|| {
    regex(concat!(
        r"\b(?:trends?|trending|charts?|graphs?|plot|candlesticks?|momentum|price action|",
        r"price history|historical|trajectory|heading|going (?:up|down))\b"
    ))
});

static CHART_REQUEST: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b(?:charts?|graphs?|plot|candlesticks?|visuali[sz]e)\b"));

static MARKET_OVERVIEW: LazyLock<Regex> = LazyLock::new(|| {
    regex(concat!(
        r"\b(?:market overview|market summary|market update|the markets?|markets today|",
        r"overall market|broader market|stock market|indices|indexes|wall street)\b"
    ))
});

static EXPLAIN: LazyLock<Regex> = LazyLock::new(|| {
    regex(concat!(
        r"^(?:what(?:'s|s| is| are| does)|explain|define|how does|how do|meaning of|",
        r"tell me about|teach me|eli5)\b|\bmean\b"
    ))
});

static COMPANY_INFO: LazyLock<Regex> = LazyLock::new(|| {
    regex(concat!(
        r"\b(?:ceo|cfo|founder|founded|headquarter(?:s|ed)?|who runs|who owns|",
        r"what does \S+ do|about the company|company info|business model|employees|",
        r"sector|industry|competitors)\b"
    ))
});

/// The fallback rules, in evaluation order
pub static FALLBACK_RULES: &[IntentRule] = &[
    IntentRule {
        name: "date_time",
        intent: Intent::DateTime,
        matches: |input| DATE_TIME.is_match(&input.lower),
    },
    IntentRule {
        name: "greeting",
        intent: Intent::Greeting,
        matches: |input| {
            input.symbols.is_empty()
                && input.text.split_whitespace().count() <= 5
                && GREETING.is_match(input.lower.trim())
        },
    },
    IntentRule {
        name: "capability",
        intent: Intent::Capability,
        matches: |input| input.symbols.is_empty() && CAPABILITY.is_match(input.lower.trim()),
    },
    IntentRule {
        name: "comparison",
        intent: Intent::Comparison,
        matches: |input| {
            COMPARISON.is_match(&input.lower)
                || (input.symbols.len() >= 2 && WHICH_IS_BETTER.is_match(&input.lower))
        },
    },
    IntentRule {
        name: "trend",
        intent: Intent::TrendAnalysis,
        matches: |input| TREND.is_match(&input.lower),
    },
    IntentRule {
        name: "market_overview",
        intent: Intent::MarketOverview,
        matches: |input| input.symbols.is_empty() && MARKET_OVERVIEW.is_match(&input.lower),
    },
    IntentRule {
        name: "educational",
        intent: Intent::Educational,
        matches: |input| {
            input.symbols.is_empty()
                && EXPLAIN.is_match(input.lower.trim())
                && glossary::find_term(&input.lower).is_some()
        },
    },
    IntentRule {
        name: "company_info",
        intent: Intent::CompanyInfo,
        matches: |input| COMPANY_INFO.is_match(&input.lower),
    },
    IntentRule {
        name: "portfolio",
        intent: Intent::PortfolioAnalysis,
        matches: |input| input.portfolio,
    },
    IntentRule {
        name: "non_financial",
        intent: Intent::NonFinancial,
        matches: |input| input.non_financial && input.symbols.is_empty(),
    },
];

/// Outcome of the fallback classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    /// Classified intent
    pub intent: Intent,
    /// Name of the rule that fired, or `"default"`
    pub rule: &'static str,
    /// Whether the query explicitly asks for a chart
    pub requires_chart: bool,
}

/// Runs the fallback rules with the configured detectors
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    non_financial: NonFinancialDetector,
    portfolio: PortfolioDetector,
}

impl IntentClassifier {
    /// Create a classifier from the query config
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            non_financial: NonFinancialDetector::new(
                config.policy.financial_qualifier_overrides,
            ),
            portfolio: PortfolioDetector::new(config.portfolio_window),
        }
    }

    /// Classify a query given the symbols already extracted from it
    pub fn classify(&self, text: &str, symbols: &[String]) -> RuleMatch {
        let input = RuleInput {
            text,
            lower: text.to_lowercase(),
            symbols,
            non_financial: self.non_financial.is_non_financial(text),
            portfolio: self.portfolio.is_portfolio(text),
        };

        let requires_chart = wants_chart(&input.lower);
        let (intent, rule) = FALLBACK_RULES
            .iter()
            .find(|rule| (rule.matches)(&input))
            .map_or((Intent::StandardAnalysis, "default"), |rule| {
                (rule.intent, rule.name)
            });

        tracing::debug!(rule, %intent, requires_chart, "Fallback rule matched");

        RuleMatch {
            intent,
            rule,
            requires_chart,
        }
    }
}

/// Whether the text explicitly asks for a chart
pub fn wants_chart(lower: &str) -> bool {
    CHART_REQUEST.is_match(lower)
}
