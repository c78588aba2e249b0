//! Follow-up detection
//!
//! Vague and anaphoric queries point back at whatever the session discussed
//! last. The same predicates drive the resolver's context merge and the
//! cache's context-dependence test, so they live together here.

use std::sync::LazyLock;

use regex::Regex;

static VAGUE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "chart", "the trend", "show me a graph please", "and the price?"
        r"^(?:and\s+|ok\s+|now\s+)?(?:(?:show|give|plot|draw)\s+(?:me\s+)?)?(?:the\s+|a\s+)?(?:chart|trend|graph|price|performance|analysis)s?(?:\s+please)?$",
        // "what's the trend", "how is the chart looking today"
        r"^(?:what(?:'s|s|\s+is)|how(?:'s|s|\s+is))\s+the\s+(?:trend|chart|graph|price|outlook|performance)(?:\s+(?:now|today|looking|doing)(?:\s+today)?)?$",
        // "how is it doing", "what about now"
        r"^(?:how(?:'s|s|\s+is)\s+it\s+(?:doing|looking|going|trending)|what\s+about\s+(?:it|now|today)|any\s+(?:update|updates|news))$",
        // "is it going up", "where is it heading"
        r"^(?:is\s+it\s+going\s+(?:up|down)|where\s+is\s+it\s+(?:heading|going))$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid vague-query regex"))
    .collect()
});

static ANAPHORA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:it|its|this|that|them|these|those|they|the stock|the company|the same)\b")
        .expect("valid anaphora regex")
});

static VARIETY_SEEKING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:another|something else|something different|different ones?|other ideas|",
        r"more ideas|give me more|any others?|alternatives?|surprise me|random|",
        r"recommend(?:ation)?s?|suggest(?:ion)?s?)\b"
    ))
    .expect("valid variety regex")
});

/// Lower-case, collapse whitespace and drop trailing punctuation
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .trim_end_matches(['?', '!', '.'])
        .trim()
        .to_string()
}

/// Whether the query names no subject and leans on prior context
///
/// "chart", "trend?", "what's the trend?" and friends.
pub fn is_vague(query: &str) -> bool {
    let normalized = normalize_query(query).replace('\u{2019}', "'");
    VAGUE_PATTERNS.iter().any(|re| re.is_match(&normalized))
}

/// Whether the query refers back with a pronoun or "the stock"
pub fn is_anaphoric(query: &str) -> bool {
    ANAPHORA.is_match(&query.to_lowercase())
}

/// Whether the user explicitly asks for fresh output
pub fn is_variety_seeking(query: &str) -> bool {
    VARIETY_SEEKING.is_match(&query.to_lowercase())
}

/// Whether the answer depends on the session rather than the text alone
pub fn is_context_dependent(query: &str) -> bool {
    is_vague(query) || is_anaphoric(query) || is_variety_seeking(query)
}

/// Whether the query points back at earlier context
///
/// Gates the caller's topic hint; the session's last symbol needs no such test.
pub fn is_follow_up(query: &str) -> bool {
    is_vague(query) || is_anaphoric(query)
}
