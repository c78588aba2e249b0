//! Out-of-domain and portfolio detectors
//!
//! Both detectors are plain boolean classifiers over raw text and run
//! independently: a query can be financial and portfolio-flagged at once.

use std::sync::LazyLock;

use regex::Regex;

use crate::symbols::lexicon;

/// Default token window between an action verb and "my <investments>"
pub const DEFAULT_PORTFOLIO_WINDOW: usize = 6;

static QUESTION_ABOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:who|what|when|where)(?:'s|s|\s+(?:is|are|was|were|did|does))\s+\S+")
        .expect("valid question regex")
});

static FINANCIAL_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:stocks?|shares?|prices?|pricing|trad(?:e|es|ing|er)|ceo|cfo|founder|",
        r"markets?|compan(?:y|ies)|corporation|invest\w*|earnings|revenue|profits?|",
        r"dividends?|crypto\w*|tickers?|etfs?|funds?|portfolio|ratio|valuation|",
        r"market cap|inflation|interest rates?|fed|federal reserve|econom\w*|bonds?|",
        r"commodit\w*|futures|forex|currenc\w*|finance|financial|ipo|charts?|trends?|",
        r"volatility|recession|gdp|yield|hedge|options|tariffs?|net worth|sec filing)\b"
    ))
    .expect("valid financial qualifier regex")
});

static OFF_TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        // recipes and food
        r"\b(?:recipes?|cook(?:ing)?|bake|baking|ingredients?|dinner|lunch|breakfast|",
        // weather
        r"weather|temperature|rain(?:ing)?|snowing|sunny|humidity|",
        // celebrities and entertainment
        r"celebrit(?:y|ies)|actor|actress|singer|movies?|films?|songs?|lyrics|",
        r"taylor swift|kardashian|beyonce|netflix show|",
        // politicians
        r"trump|biden|obama|putin|harris|pelosi|president|senator|election|",
        // sports
        r"football|soccer|basketball|baseball|nba|nfl|super bowl|world cup|",
        // everything else people ask a chat box
        r"jokes?|poem|horoscope|dating|girlfriend|boyfriend)\b"
    ))
    .expect("valid off-topic regex")
});

/// Flags queries that fall outside the financial domain
#[derive(Debug, Clone)]
pub struct NonFinancialDetector {
    qualifier_overrides: bool,
}

impl Default for NonFinancialDetector {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NonFinancialDetector {
    /// Create a detector
    ///
    /// With `qualifier_overrides` set, any financial qualifier or instrument
    /// mention anywhere in the sentence suppresses the classification.
    pub fn new(qualifier_overrides: bool) -> Self {
        Self {
            qualifier_overrides,
        }
    }

    /// Whether `text` is an out-of-domain question
    pub fn is_non_financial(&self, text: &str) -> bool {
        let lower = text.to_lowercase();

        if !(QUESTION_ABOUT.is_match(&lower) || OFF_TOPIC.is_match(&lower)) {
            return false;
        }

        if self.qualifier_overrides && has_financial_context(text, &lower) {
            tracing::debug!("Financial qualifier suppresses non-financial match");
            return false;
        }

        // The blocklist stands on its own; a bare question needs no qualifier
        OFF_TOPIC.is_match(&lower) || !has_financial_context(text, &lower)
    }
}

/// Financial vocabulary, a named instrument, or an upper-case known ticker
pub fn has_financial_context(text: &str, lower: &str) -> bool {
    FINANCIAL_QUALIFIER.is_match(lower)
        || lexicon::mentions_instrument(lower)
        || text
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '$')
            .map(|token| token.trim_start_matches('$'))
            .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_uppercase()))
            .any(|token| lexicon::is_known_symbol(token) && !lexicon::is_stopword(token))
}

mod portfolio_terms {
    pub const KEYWORDS: &[&str] = &[
        "portfolio",
        "holdings",
        "positions",
        "allocation",
        "rebalance",
        "rebalancing",
        "my investments",
        "my stocks",
        "my shares",
        "my assets",
    ];

    pub const ACTION_VERBS: &[&str] = &[
        "help",
        "improve",
        "optimize",
        "optimise",
        "diversify",
        "review",
        "analyze",
        "analyse",
        "check",
        "balance",
        "evaluate",
        "assess",
        "grow",
    ];

    pub const INVESTMENT_NOUNS: &[&str] = &[
        "investments",
        "investment",
        "stocks",
        "shares",
        "assets",
        "money",
        "savings",
        "funds",
        "retirement",
        "401k",
        "ira",
        "crypto",
    ];
}

/// Flags queries about the user's own holdings
#[derive(Debug, Clone)]
pub struct PortfolioDetector {
    window: usize,
}

impl Default for PortfolioDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PORTFOLIO_WINDOW)
    }
}

impl PortfolioDetector {
    /// Create a detector with the given verb-to-possessive token window
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Whether `text` asks about the user's portfolio
    pub fn is_portfolio(&self, text: &str) -> bool {
        let lower = text.to_lowercase();

        if portfolio_terms::KEYWORDS
            .iter()
            .any(|kw| contains_phrase(&lower, kw))
        {
            return true;
        }

        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        tokens.iter().enumerate().any(|(i, token)| {
            portfolio_terms::ACTION_VERBS.contains(token)
                && self.possessive_follows(&tokens[i + 1..])
        })
    }

    fn possessive_follows(&self, rest: &[&str]) -> bool {
        let end = rest.len().min(self.window);
        rest[..end].windows(2).any(|pair| {
            pair[0] == "my" && portfolio_terms::INVESTMENT_NOUNS.contains(&pair[1])
        })
    }
}

/// Whole-word phrase containment
pub(crate) fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
