//! Edit-distance correction for near-miss tickers

use std::sync::LazyLock;

use super::lexicon::COMMON_TICKERS;
use super::validator::normalize;

/// Largest edit distance the matcher will correct across
pub const MAX_CORRECTION_DISTANCE: usize = 1;

/// Reference list for correction, in `COMMON_TICKERS` order
///
/// One- and two-letter symbols are excluded: almost every short word sits one
/// edit away from one of them.
pub static FUZZY_CANDIDATES: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    COMMON_TICKERS
        .iter()
        .copied()
        .filter(|ticker| ticker.len() >= 3)
        .collect()
});

/// Correct a near-miss token to a common ticker
///
/// Exact matches short-circuit. Otherwise the first candidate (in reference
/// order) within one insertion, deletion or substitution wins.
pub fn fuzzy_match(token: &str) -> Option<&'static str> {
    let upper = normalize(token)?;

    if let Some(exact) = FUZZY_CANDIDATES.iter().copied().find(|c| *c == upper) {
        return Some(exact);
    }

    FUZZY_CANDIDATES
        .iter()
        .find(|candidate| edit_distance(&upper, candidate) <= MAX_CORRECTION_DISTANCE)
        .copied()
}

/// Levenshtein distance over ASCII bytes
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a = a.as_bytes();
    let b = b.as_bytes();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("TSLA", "TSLA"), 0);
        assert_eq!(edit_distance("TSLS", "TSLA"), 1);
        assert_eq!(edit_distance("TSL", "TSLA"), 1);
        assert_eq!(edit_distance("ATSLA", "TSLA"), 1);
        assert_eq!(edit_distance("AMD", "AMZN"), 2);
        assert_eq!(edit_distance("", "ABC"), 3);
    }

    #[test]
    fn test_exact_match_short_circuits() {
        assert_eq!(fuzzy_match("NVDA"), Some("NVDA"));
        assert_eq!(fuzzy_match("goog"), Some("GOOG"));
    }

    #[test]
    fn test_corrects_single_edit() {
        assert_eq!(fuzzy_match("TSLS"), Some("TSLA"));
        assert_eq!(fuzzy_match("APPL"), Some("AAPL"));
        assert_eq!(fuzzy_match("MSF"), Some("MSFT"));
        assert_eq!(fuzzy_match("NVDIA"), Some("NVDA"));
    }

    #[test]
    fn test_ties_follow_reference_order() {
        // GOOX is one edit from GOOG only; GOOGX is one edit from GOOGL and GOOG,
        // and GOOGL comes first in the reference list.
        assert_eq!(fuzzy_match("GOOX"), Some("GOOG"));
        assert_eq!(fuzzy_match("GOOGX"), Some("GOOGL"));
    }

    #[test]
    fn test_rejects_distant_and_malformed() {
        assert_eq!(fuzzy_match("ZZZZ"), None);
        assert_eq!(fuzzy_match("12"), None);
        assert_eq!(fuzzy_match(""), None);
    }
}
