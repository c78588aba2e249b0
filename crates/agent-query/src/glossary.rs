//! Financial concepts the educational handler can explain

use crate::detectors::contains_phrase;

/// Term, aliases, explanation
pub const TERMS: &[(&str, &[&str], &str)] = &[
    (
        "P/E ratio",
        &["p/e", "pe ratio", "price to earnings", "price-to-earnings"],
        "The price-to-earnings ratio divides a share price by earnings per share. A higher P/E means investors pay more for each dollar of current profit, usually because they expect growth.",
    ),
    (
        "EPS",
        &["eps", "earnings per share"],
        "Earnings per share is net income divided by shares outstanding. It is the profit attributable to a single share.",
    ),
    (
        "Market capitalization",
        &["market cap", "market capitalization", "market capitalisation"],
        "Market capitalization is the share price multiplied by shares outstanding: the market's valuation of the whole company.",
    ),
    (
        "Dividend",
        &["dividend", "dividends", "dividend yield"],
        "A dividend is a cash payment a company makes to shareholders out of its profits. Dividend yield is the annual dividend divided by the share price.",
    ),
    (
        "ETF",
        &["etf", "etfs", "exchange traded fund", "exchange-traded fund"],
        "An exchange-traded fund holds a basket of assets and trades on an exchange like a single stock, giving cheap diversified exposure.",
    ),
    (
        "Index fund",
        &["index fund", "index funds"],
        "An index fund tracks a market index such as the S&P 500 instead of picking individual securities.",
    ),
    (
        "Bond",
        &["bond", "bonds", "treasury", "treasuries"],
        "A bond is a loan to a government or company that pays periodic interest and returns the principal at maturity.",
    ),
    (
        "Options",
        &["option", "options", "call option", "put option"],
        "An option gives the right, not the obligation, to buy (call) or sell (put) an asset at a set price before a set date.",
    ),
    (
        "Short selling",
        &["short selling", "shorting", "short sell", "short squeeze"],
        "Short selling means borrowing shares, selling them, and buying them back later, profiting if the price falls. Losses are unbounded if it rises.",
    ),
    (
        "Bull and bear markets",
        &["bull market", "bear market", "bullish", "bearish"],
        "A bull market is a sustained rise in prices; a bear market is a decline of 20% or more from a recent high.",
    ),
    (
        "Volatility",
        &["volatility", "volatile", "vix"],
        "Volatility measures how widely prices swing. The VIX index tracks the market's expected volatility over the next 30 days.",
    ),
    (
        "Diversification",
        &["diversification", "diversify", "diversified"],
        "Diversification spreads money across assets that do not move together, so a loss in one holding hurts the whole portfolio less.",
    ),
    (
        "Inflation",
        &["inflation", "cpi", "consumer price index"],
        "Inflation is the rate at which prices rise across the economy, eroding the purchasing power of cash.",
    ),
    (
        "Recession",
        &["recession"],
        "A recession is a broad, sustained decline in economic activity, often identified by two consecutive quarters of falling GDP.",
    ),
    (
        "IPO",
        &["ipo", "initial public offering"],
        "An initial public offering is the first sale of a company's shares to the public on a stock exchange.",
    ),
    (
        "Stock split",
        &["stock split", "split"],
        "A stock split increases the number of shares while lowering the price per share in proportion. The company's value does not change.",
    ),
    (
        "Moving average",
        &["moving average", "sma", "ema"],
        "A moving average smooths price data by averaging the last N periods. Crossovers between short and long averages are common trend signals.",
    ),
    (
        "RSI",
        &["rsi", "relative strength index"],
        "The relative strength index is a momentum oscillator from 0 to 100. Readings above 70 suggest overbought conditions and below 30 oversold.",
    ),
    (
        "MACD",
        &["macd"],
        "MACD tracks the gap between the 12- and 26-period exponential moving averages against a 9-period signal line.",
    ),
    (
        "Compound interest",
        &["compound interest", "compounding"],
        "Compounding earns returns on previous returns, so growth accelerates over time.",
    ),
    (
        "Dollar-cost averaging",
        &["dollar cost averaging", "dollar-cost averaging", "dca"],
        "Dollar-cost averaging invests a fixed amount at regular intervals regardless of price, which smooths out the entry price.",
    ),
];

/// Find the first glossary term mentioned in lower-cased text
pub fn find_term(lower: &str) -> Option<(&'static str, &'static str)> {
    TERMS.iter().find_map(|(term, aliases, explanation)| {
        aliases
            .iter()
            .any(|alias| contains_phrase(lower, alias))
            .then_some((*term, *explanation))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_term() {
        assert_eq!(find_term("what is a p/e ratio").map(|t| t.0), Some("P/E ratio"));
        assert_eq!(find_term("explain short selling").map(|t| t.0), Some("Short selling"));
        assert_eq!(find_term("what is an etf?").map(|t| t.0), Some("ETF"));
        assert!(find_term("what is a recipe").is_none());
    }

    #[test]
    fn test_aliases_need_word_boundaries() {
        // "split" inside "splitting" and "rsi" inside "versions" do not count
        assert!(find_term("versions").is_none());
        assert!(find_term("splitting hairs").is_none());
    }
}
