//! Curated word lists backing symbol validation and extraction

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Words that must never be promoted to ticker symbols, whatever their case
pub const STOPWORDS: &[&str] = &[
    // Pronouns and determiners
    "I", "ME", "MY", "MINE", "WE", "US", "OUR", "OURS", "YOU", "YOUR", "YOURS", "HE", "HIM",
    "HIS", "SHE", "HER", "HERS", "IT", "ITS", "THEY", "THEM", "THEIR", "THIS", "THAT", "THESE",
    "THOSE", "A", "AN", "THE", "SOME", "ANY", "EACH", "EVERY", "BOTH", "FEW", "MANY", "MUCH",
    "MORE", "MOST", "LESS", "LEAST", "OTHER", "SUCH", "OWN", "SAME", "ALL", "NONE", "ONE",
    "TWO", "THREE", "FOUR", "FIVE", "SIX", "SEVEN", "EIGHT", "NINE", "TEN",
    // Question words
    "WHO", "WHOM", "WHOSE", "WHAT", "WHEN", "WHERE", "WHY", "HOW", "WHICH", "WHATS", "HOWS",
    "WHOS",
    // Auxiliaries and common verbs
    "AM", "IS", "ARE", "WAS", "WERE", "BE", "BEEN", "BEING", "DO", "DOES", "DID", "DONE",
    "HAVE", "HAS", "HAD", "CAN", "COULD", "WILL", "WOULD", "SHALL", "MAY", "MIGHT", "MUST",
    "GET", "GETS", "GOT", "GIVE", "GAVE", "GO", "GOES", "GOING", "GONE", "MAKE", "MADE",
    "TAKE", "TOOK", "SEE", "SAW", "SEEN", "LOOK", "SHOW", "SHOWS", "TELL", "TOLD", "SAY",
    "SAID", "KNOW", "THINK", "WANT", "NEED", "LIKE", "LOVE", "HATE", "FIND", "HELP", "KEEP",
    "LET", "PUT", "RUN", "SET", "TRY", "USE", "WORK", "CALL", "COME", "CAME", "MEAN",
    "FEEL", "SEEM", "PLAY", "MOVE", "LIVE", "PAY", "MEET", "READ", "LEAD", "STAY", "TURN",
    "START", "STOP", "OPEN", "CLOSE", "PLEASE", "THANK", "THANKS",
    "DONT", "CANT", "WONT", "ISNT", "ARENT", "DIDNT", "IM", "IVE", "ID", "ILL", "YOURE",
    // Prepositions and conjunctions
    "OF", "IN", "ON", "AT", "BY", "FOR", "WITH", "ABOUT", "INTO", "ONTO", "FROM", "TO",
    "UP", "DOWN", "OUT", "OFF", "OVER", "UNDER", "AFTER", "SINCE", "UNTIL", "WHILE", "AS",
    "THAN", "THEN", "SO", "IF", "OR", "AND", "BUT", "NOR", "YET", "NOT", "NO", "YES", "VS",
    "VIA", "PER", "PLUS", "AGO", "AWAY", "BACK", "ALSO", "JUST", "ONLY", "EVEN", "STILL",
    "VERY", "TOO", "HERE", "THERE", "NOW", "TODAY", "SOON", "LATER", "EVER", "NEVER",
    "AGAIN", "ONCE", "WELL", "ELSE", "MAYBE", "ABOVE", "BELOW", "NEAR", "NEXT", "LAST",
    "PAST", "AMONG",
    // Common nouns and adjectives
    "GOOD", "BAD", "BEST", "WORST", "BIG", "SMALL", "HIGH", "LOW", "NEW", "OLD", "LONG",
    "SHORT", "FAST", "SLOW", "HOT", "COLD", "REAL", "TRUE", "FALSE", "SURE", "OK", "OKAY",
    "HI", "HEY", "HELLO", "BYE", "DAY", "DAYS", "WEEK", "MONTH", "YEAR", "YEARS", "TIME",
    "DATE", "HOUR", "NIGHT", "WORLD", "LIFE", "HOME", "PEOPLE", "MAN", "WOMAN", "GUY",
    "THING", "WAY", "PART", "PLACE", "CASE", "POINT", "FACT", "IDEA", "NEWS", "FOOD", "CAR",
    "BOOK", "GAME", "MOVIE", "MUSIC", "WATER", "MONEY", "CASH", "FREE", "NICE", "COOL",
    "GREAT", "FINE", "RIGHT", "LEFT", "FULL", "EASY", "HARD", "SAFE", "MAIN", "KEY", "TOP",
    "FIRST", "THING", "WORD", "NAME", "LOL", "OMG", "BTW", "FYI", "ASAP", "TBH", "IMO",
    "AI", "API", "USA", "UK", "EU", "CHINA", "CAT", "DOG", "FUN", "JOB", "TEAM",
    // Generic finance vocabulary
    "CHART", "CHARTS", "GRAPH", "PLOT", "PRICE", "PRICES", "TREND", "TRENDS", "STOCK",
    "STOCKS", "SHARE", "SHARES", "TRADE", "TRADES", "BUY", "SELL", "HOLD", "BULL", "BEAR",
    "RALLY", "DIP", "DIPS", "GAIN", "GAINS", "LOSS", "RISK", "YIELD", "BOND", "BONDS",
    "FUND", "FUNDS", "ETF", "ETFS", "IPO", "CEO", "CFO", "CTO", "EPS", "PE", "ROI", "GDP",
    "CPI", "FED", "SEC", "USD", "EUR", "GBP", "JPY", "NYSE", "RATE", "RATES", "CAP",
    "VALUE", "TOTAL", "RATIO", "DEBT", "LOAN", "BANK", "TAX", "TAXES", "CALLS", "PUTS",
    "LONG", "MARGIN", "ASSET", "CHIP", "CHIPS", "CRASH", "PUMP", "DUMP", "MOON", "HODL",
    "YOLO", "FOMO", "ATH", "OPEN", "BID", "ASK", "SPOT", "INDEX", "QUOTE", "DATA", "INFO",
    "SCORE", "COST", "FEES", "FEE", "PROFIT", "TODAY", "DAILY", "PRO", "CON", "CONS",
    // Politicians and public figures
    "TRUMP", "BIDEN", "OBAMA", "PUTIN", "XI", "HARRIS", "PENCE", "VANCE", "BUSH", "POPE",
    "KING", "QUEEN", "ELON",
    // SQL keywords
    "DROP", "TABLE", "SELECT", "INSERT", "DELETE", "UPDATE", "UNION", "JOIN", "WHERE",
    "VALUES", "ALTER", "EXEC", "NULL", "WHERE", "LIMIT", "ORDER", "GROUP", "HAVING",
];

/// Short symbols (one or two letters) that are accepted despite their length
pub const KNOWN_SHORT_SYMBOLS: &[&str] = &[
    "F", "T", "V", "C", "X", "GE", "GM", "KO", "MA", "BA", "MS", "GS", "HD", "MU", "PG",
    "VZ", "ZM", "SQ", "GC", "SI", "CL", "NG", "HG", "PL", "ZW", "ZC",
];

/// Commonly requested tickers in reference order; fuzzy ties go to the earlier entry
pub const COMMON_TICKERS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "GOOG", "AMZN", "TSLA", "META", "NVDA", "NFLX", "AMD", "INTC",
    "IBM", "ORCL", "CRM", "ADBE", "CSCO", "QCOM", "AVGO", "TXN", "PYPL", "SHOP", "UBER",
    "LYFT", "ABNB", "SNOW", "PLTR", "COIN", "HOOD", "RBLX", "ROKU", "DIS", "NKE", "SBUX",
    "MCD", "PEP", "WMT", "TGT", "JPM", "BAC", "WFC", "AXP", "BRK", "JNJ", "PFE",
    "MRNA", "ABBV", "MRK", "LLY", "UNH", "CVS", "XOM", "CVX", "COP", "TMUS", "SPY", "QQQ",
    "DIA", "IWM", "VTI", "VOO", "GLD", "SLV", "USO", "UNG", "TLT", "ARKK", "BTC", "ETH",
    "SOL", "ADA", "XRP", "DOGE", "LTC", "AVAX", "MATIC", "BNB", "SHIB",
];

/// Known symbols whose lower-case spelling is an ordinary English word
pub const WORDLIKE_SYMBOLS: &[&str] = &[
    "SHOP", "SNOW", "COIN", "HOOD", "SOL", "ADA", "COP", "DIS", "PEP", "MRK", "VOO",
];

/// Natural-language names mapped to their instrument symbol
pub const NATURAL_NAMES: &[(&str, &str)] = &[
    // Crypto
    ("bitcoin", "BTC"),
    ("ethereum", "ETH"),
    ("ether", "ETH"),
    ("solana", "SOL"),
    ("dogecoin", "DOGE"),
    ("cardano", "ADA"),
    ("ripple", "XRP"),
    ("litecoin", "LTC"),
    ("avalanche", "AVAX"),
    ("polygon", "MATIC"),
    ("binance", "BNB"),
    // Commodities
    ("gold", "GC"),
    ("silver", "SI"),
    ("oil", "CL"),
    ("crude", "CL"),
    ("crude oil", "CL"),
    ("natural gas", "NG"),
    ("copper", "HG"),
    ("platinum", "PL"),
    ("wheat", "ZW"),
    ("corn", "ZC"),
    // Indices
    ("s&p", "SPY"),
    ("s&p 500", "SPY"),
    ("sp500", "SPY"),
    ("nasdaq", "QQQ"),
    ("dow", "DIA"),
    ("dow jones", "DIA"),
    // Companies
    ("apple", "AAPL"),
    ("microsoft", "MSFT"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("amazon", "AMZN"),
    ("tesla", "TSLA"),
    ("nvidia", "NVDA"),
    ("meta", "META"),
    ("facebook", "META"),
    ("netflix", "NFLX"),
    ("intel", "INTC"),
    ("oracle", "ORCL"),
    ("salesforce", "CRM"),
    ("adobe", "ADBE"),
    ("cisco", "CSCO"),
    ("qualcomm", "QCOM"),
    ("broadcom", "AVGO"),
    ("paypal", "PYPL"),
    ("shopify", "SHOP"),
    ("uber", "UBER"),
    ("airbnb", "ABNB"),
    ("snowflake", "SNOW"),
    ("palantir", "PLTR"),
    ("coinbase", "COIN"),
    ("robinhood", "HOOD"),
    ("roblox", "RBLX"),
    ("disney", "DIS"),
    ("nike", "NKE"),
    ("starbucks", "SBUX"),
    ("mcdonald", "MCD"),
    ("mcdonalds", "MCD"),
    ("coca-cola", "KO"),
    ("cocacola", "KO"),
    ("pepsi", "PEP"),
    ("pepsico", "PEP"),
    ("walmart", "WMT"),
    ("jpmorgan", "JPM"),
    ("boeing", "BA"),
    ("ford", "F"),
    ("visa", "V"),
    ("mastercard", "MA"),
    ("berkshire", "BRK"),
    ("berkshire hathaway", "BRK"),
    ("pfizer", "PFE"),
    ("moderna", "MRNA"),
    ("exxon", "XOM"),
    ("chevron", "CVX"),
];

/// Display names for instruments the handlers describe
pub const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("GOOGL", "Alphabet Inc."),
    ("GOOG", "Alphabet Inc."),
    ("AMZN", "Amazon.com Inc."),
    ("TSLA", "Tesla Inc."),
    ("META", "Meta Platforms Inc."),
    ("NVDA", "NVIDIA Corporation"),
    ("NFLX", "Netflix Inc."),
    ("AMD", "Advanced Micro Devices"),
    ("INTC", "Intel Corporation"),
    ("JPM", "JPMorgan Chase & Co."),
    ("DIS", "The Walt Disney Company"),
    ("KO", "The Coca-Cola Company"),
    ("WMT", "Walmart Inc."),
    ("BRK", "Berkshire Hathaway"),
    ("SPY", "S&P 500 ETF"),
    ("QQQ", "Nasdaq-100 ETF"),
    ("DIA", "Dow Jones Industrial Average ETF"),
    ("BTC", "Bitcoin"),
    ("ETH", "Ethereum"),
    ("SOL", "Solana"),
    ("DOGE", "Dogecoin"),
    ("GC", "Gold futures"),
    ("SI", "Silver futures"),
    ("CL", "Crude oil futures"),
    ("NG", "Natural gas futures"),
    ("HG", "Copper futures"),
];

/// Symbols quoted as crypto pairs by market-data providers
pub const CRYPTO_SYMBOLS: &[&str] = &[
    "BTC", "ETH", "SOL", "ADA", "XRP", "DOGE", "LTC", "AVAX", "MATIC", "BNB", "SHIB",
];

/// Symbols quoted as front-month futures by market-data providers
pub const FUTURES_SYMBOLS: &[&str] = &["GC", "SI", "CL", "NG", "HG", "PL", "ZW", "ZC"];

static STOPWORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS.iter().copied().collect());

static KNOWN_SET: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    KNOWN_SHORT_SYMBOLS
        .iter()
        .chain(COMMON_TICKERS.iter())
        .copied()
        .collect()
});

static NATURAL_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| NATURAL_NAMES.iter().copied().collect());

/// Check an upper-cased token against the stopword set
pub fn is_stopword(upper: &str) -> bool {
    STOPWORD_SET.contains(upper)
}

/// Check an upper-cased token against the known-symbol allowlist
pub fn is_known_symbol(upper: &str) -> bool {
    KNOWN_SET.contains(upper)
}

/// Whether a known symbol reads as an ordinary word when typed in lower case
pub fn is_wordlike(upper: &str) -> bool {
    WORDLIKE_SYMBOLS.contains(&upper)
}

/// Look up a lower-cased name (one or two words) in the natural-language map
pub fn natural_symbol(lower: &str) -> Option<&'static str> {
    NATURAL_MAP.get(lower).copied()
}

/// Whether the lower-cased text mentions any natural-language instrument name
pub fn mentions_instrument(lower: &str) -> bool {
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '&' || c == '-'))
        .filter(|w| !w.is_empty())
        .collect();

    words.iter().any(|w| NATURAL_MAP.contains_key(w))
        || words
            .windows(2)
            .any(|pair| NATURAL_MAP.contains_key(format!("{} {}", pair[0], pair[1]).as_str()))
}

/// Human-readable name for a symbol, if one is curated
pub fn display_name(symbol: &str) -> Option<&'static str> {
    DISPLAY_NAMES
        .iter()
        .find(|(sym, _)| *sym == symbol)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_symbols_are_never_stopwords() {
        for symbol in KNOWN_SHORT_SYMBOLS.iter().chain(COMMON_TICKERS) {
            assert!(!is_stopword(symbol), "{symbol} is both known and a stopword");
        }
        for (_, symbol) in NATURAL_NAMES {
            assert!(!is_stopword(symbol), "{symbol} is mapped and a stopword");
        }
    }

    #[test]
    fn test_natural_names_map_to_known_symbols() {
        for (name, symbol) in NATURAL_NAMES {
            assert!(is_known_symbol(symbol), "{name} maps to unknown {symbol}");
        }
    }

    #[test]
    fn test_mentions_instrument() {
        assert!(mentions_instrument("what is bitcoin"));
        assert!(mentions_instrument("how is natural gas doing"));
        assert!(!mentions_instrument("what is your name"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("AAPL"), Some("Apple Inc."));
        assert_eq!(display_name("ZZZZ"), None);
    }
}
