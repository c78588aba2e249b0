//! Safe symbol extraction from free text

use std::collections::HashSet;

use super::fuzzy::fuzzy_match;
use super::lexicon;
use super::validator::{is_valid_marked_ticker, is_valid_ticker};

/// Extracts validated instrument symbols from free text
///
/// Each token is tried, in priority order, as:
/// 1. an explicit `$TICKER` marker
/// 2. a natural-language instrument name (one or two words, e.g. "natural gas")
/// 3. a literal ticker accepted by the validator
/// 4. a near-miss ticker corrected by the fuzzy matcher
///
/// Output is deduplicated and keeps first-seen order. An empty result means
/// "ask the user", never an error.
#[derive(Debug, Clone, Default)]
pub struct SymbolExtractor;

struct Token {
    cleaned: String,
    lower: String,
    marked: bool,
}

impl SymbolExtractor {
    /// Create a new extractor
    pub fn new() -> Self {
        Self
    }

    /// Extract the ordered, unique list of symbols mentioned in `text`
    pub fn extract(&self, text: &str) -> Vec<String> {
        let tokens: Vec<Token> = text
            .split(|c: char| c.is_whitespace() || c == ',' || c == '/')
            .filter_map(Token::parse)
            .collect();

        let mut symbols = Vec::new();
        let mut seen = HashSet::new();
        let mut push = |symbol: String| {
            if seen.insert(symbol.clone()) {
                symbols.push(symbol);
            }
        };

        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            i += 1;

            if token.marked && is_valid_marked_ticker(&token.cleaned) {
                push(token.cleaned.to_ascii_uppercase());
                continue;
            }

            if let Some(next) = tokens.get(i) {
                let phrase = format!("{} {}", token.lower, next.lower);
                if let Some(symbol) = lexicon::natural_symbol(&phrase) {
                    push(symbol.to_string());
                    i += 1;
                    continue;
                }
            }

            if let Some(symbol) = lexicon::natural_symbol(&token.lower) {
                push(symbol.to_string());
                continue;
            }

            if let Some(symbol) = Self::literal(token) {
                push(symbol);
                continue;
            }

            if let Some(symbol) = Self::corrected(token) {
                push(symbol.to_string());
            }
        }

        symbols
    }

    /// Literal ticker acceptance
    ///
    /// Tokens typed in upper case only need to pass the validator. Anything typed
    /// in lower or mixed case must also be a known ticker that does not read as
    /// an ordinary word.
    fn literal(token: &Token) -> Option<String> {
        if !is_valid_ticker(&token.cleaned) {
            return None;
        }

        let upper = token.cleaned.to_ascii_uppercase();
        if token.is_upper_case() {
            return Some(upper);
        }

        (lexicon::is_known_symbol(&upper) && !lexicon::is_wordlike(&upper)).then_some(upper)
    }

    fn corrected(token: &Token) -> Option<&'static str> {
        let len = token.cleaned.len();
        if !token.is_upper_case() || !(3..=5).contains(&len) {
            return None;
        }
        if lexicon::is_stopword(&token.cleaned) {
            return None;
        }
        fuzzy_match(&token.cleaned)
    }
}

impl Token {
    fn parse(raw: &str) -> Option<Self> {
        let marked = raw.starts_with('$');
        let cleaned = clean_token(raw);
        if cleaned.is_empty() {
            return None;
        }

        Some(Self {
            lower: cleaned.to_lowercase(),
            cleaned,
            marked,
        })
    }

    fn is_upper_case(&self) -> bool {
        self.cleaned.bytes().all(|b| b.is_ascii_uppercase())
    }
}

/// Strip punctuation, quotes, possessives and apostrophes from a raw token
fn clean_token(raw: &str) -> String {
    let normalized = raw.replace(['\u{2019}', '\u{2018}'], "'");
    let mut trimmed = normalized.trim_matches(|c: char| !c.is_alphanumeric() && c != '&');

    if let Some(stem) = trimmed
        .strip_suffix("'s")
        .or_else(|| trimmed.strip_suffix("'S"))
    {
        trimmed = stem;
    }

    trimmed
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '&' || *c == '-')
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

/// Extract symbols with a default extractor
pub fn extract_safe_symbols(text: &str) -> Vec<String> {
    SymbolExtractor::new().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_token() {
        assert_eq!(clean_token("AAPL,"), "AAPL");
        assert_eq!(clean_token("'bitcoin'"), "bitcoin");
        assert_eq!(clean_token("what's"), "what");
        assert_eq!(clean_token("nvidia\u{2019}s"), "nvidia");
        assert_eq!(clean_token("don't"), "dont");
        assert_eq!(clean_token("[TSLA]"), "TSLA");
        assert_eq!(clean_token("stocks;--"), "stocks");
        assert_eq!(clean_token("';"), "");
        assert_eq!(clean_token("$AAPL"), "AAPL");
        assert_eq!(clean_token("s&p"), "s&p");
    }

    #[test]
    fn test_stopwords_never_extracted() {
        assert!(extract_safe_symbols("WHO is trump?").is_empty());
        assert!(extract_safe_symbols("SHOW ME THE CHART PRICE TREND").is_empty());
        assert!(extract_safe_symbols("IT IS WHAT IT IS").is_empty());
    }

    #[test]
    fn test_natural_language_names() {
        assert_eq!(extract_safe_symbols("show bitcoin chart"), vec!["BTC"]);
        assert_eq!(extract_safe_symbols("natural gas prices?"), vec!["NG"]);
        assert_eq!(extract_safe_symbols("(Gold), silver; and oil!"), vec!["GC", "SI", "CL"]);
        assert_eq!(extract_safe_symbols("how is the s&p 500 doing"), vec!["SPY"]);
        assert_eq!(extract_safe_symbols("apple's earnings"), vec!["AAPL"]);
    }

    #[test]
    fn test_natural_name_emitted_once() {
        assert_eq!(extract_safe_symbols("bitcoin, BITCOIN and 'bitcoin'"), vec!["BTC"]);
        assert_eq!(extract_safe_symbols("BTC vs bitcoin"), vec!["BTC"]);
    }

    #[test]
    fn test_every_natural_name_survives_punctuation() {
        for (name, symbol) in lexicon::NATURAL_NAMES {
            for text in [
                name.to_string(),
                format!("{name}?"),
                format!("'{name}'"),
                format!("({name}),"),
                format!("\"{name}\"!"),
                format!("{name}'s"),
                format!("{name}, {name}!"),
            ] {
                assert_eq!(extract_safe_symbols(&text), vec![*symbol], "{text}");
            }
        }
    }

    #[test]
    fn test_order_and_dedup() {
        assert_eq!(extract_safe_symbols("AAPL vs MSFT"), vec!["AAPL", "MSFT"]);
        assert_eq!(extract_safe_symbols("MSFT, AAPL, MSFT"), vec!["MSFT", "AAPL"]);
        assert_eq!(extract_safe_symbols("AAPL/MSFT"), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_dollar_marker() {
        assert_eq!(extract_safe_symbols("what about $XX today"), vec!["XX"]);
        assert_eq!(extract_safe_symbols("$tsla"), vec!["TSLA"]);
        assert!(extract_safe_symbols("$CHART").is_empty());
    }

    #[test]
    fn test_fuzzy_correction() {
        assert_eq!(extract_safe_symbols("TSLS price"), vec!["TSLA"]);
        // Lower-case words are never fuzzed into tickers
        assert!(extract_safe_symbols("tsls").is_empty());
    }

    #[test]
    fn test_lower_case_tokens_need_known_symbol() {
        assert_eq!(extract_safe_symbols("nvda price"), vec!["NVDA"]);
        assert!(extract_safe_symbols("i want to shop for shoes").is_empty());
        assert!(extract_safe_symbols("qwer").is_empty());
    }

    #[test]
    fn test_sql_fragment_rejected() {
        assert!(extract_safe_symbols("'; DROP TABLE stocks;-- price").is_empty());
    }

    #[test]
    fn test_two_letter_boundary() {
        assert!(extract_safe_symbols("XX").is_empty());
        assert_eq!(extract_safe_symbols("GE and F"), vec!["GE", "F"]);
    }

    #[test]
    fn test_idempotent() {
        let text = "Compare $AMD, nvidia and TSLS against gold";
        assert_eq!(extract_safe_symbols(text), extract_safe_symbols(text));
        assert_eq!(extract_safe_symbols(text), vec!["AMD", "NVDA", "TSLA", "GC"]);
    }
}
