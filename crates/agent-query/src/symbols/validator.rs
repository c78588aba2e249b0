//! Ticker plausibility checks
//!
//! Validation is stopword-driven: a token that reads as an English word or as
//! generic finance vocabulary is never accepted, whatever its shape.

use super::fuzzy::{edit_distance, FUZZY_CANDIDATES};
use super::lexicon;

/// Maximum ticker length accepted by the validator
pub const MAX_TICKER_LEN: usize = 5;

/// Decide whether a token is a plausible instrument symbol
///
/// Tokens are case-normalized before checking. Two-letter (and shorter) tokens
/// pass only when present in the known-symbol allowlist. Unknown tokens of three
/// or more letters sitting one edit away from a known ticker are rejected so the
/// fuzzy matcher can decide the corrected form.
pub fn is_valid_ticker(token: &str) -> bool {
    let Some(upper) = normalize(token) else {
        return false;
    };

    if lexicon::is_stopword(&upper) {
        return false;
    }

    if upper.len() <= 2 {
        return lexicon::is_known_symbol(&upper);
    }

    if lexicon::is_known_symbol(&upper) {
        return true;
    }

    !is_near_miss(&upper)
}

/// Validate a token carrying an explicit `$` marker
///
/// The marker states intent, so the short-token allowlist and the near-miss
/// deferral are skipped. Stopwords are still rejected.
pub fn is_valid_marked_ticker(token: &str) -> bool {
    normalize(token).is_some_and(|upper| !lexicon::is_stopword(&upper))
}

/// Upper-case a token and check it against `^[A-Z]{1,5}$`
pub(crate) fn normalize(token: &str) -> Option<String> {
    let trimmed = token.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_TICKER_LEN {
        return None;
    }

    let upper = trimmed.to_ascii_uppercase();
    upper
        .bytes()
        .all(|b| b.is_ascii_uppercase())
        .then_some(upper)
}

fn is_near_miss(upper: &str) -> bool {
    FUZZY_CANDIDATES
        .iter()
        .any(|candidate| edit_distance(upper, candidate) == 1)
}
