//! Market data collaborator

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use yahoo_finance_api as yahoo;

use crate::error::MarketDataError;
use crate::symbols::lexicon::{CRYPTO_SYMBOLS, FUTURES_SYMBOLS};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Default Yahoo requests per minute
const DEFAULT_REQUESTS_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(60) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

/// Latest market snapshot for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    pub symbol: String,
    pub price: f64,
    /// Change versus the previous close, in percent
    pub change_percent: f64,
    pub volume: u64,
    pub timestamp: DateTime<Utc>,
}

/// Fetches the latest quote for a symbol
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch the latest quote
    async fn fetch(&self, symbol: &str) -> Result<MarketQuote, MarketDataError>;
}

/// Map a symbol to the form Yahoo quotes it under
///
/// Crypto trades as a USD pair and commodities as front-month futures.
pub fn provider_symbol(symbol: &str) -> String {
    if CRYPTO_SYMBOLS.contains(&symbol) {
        format!("{symbol}-USD")
    } else if FUTURES_SYMBOLS.contains(&symbol) {
        format!("{symbol}=F")
    } else if symbol == "BRK" {
        "BRK-B".to_string()
    } else {
        symbol.to_string()
    }
}

/// Yahoo Finance market data
pub struct YahooMarketData {
    rate_limiter: SharedRateLimiter,
}

impl Default for YahooMarketData {
    fn default() -> Self {
        Self::new(None)
    }
}

impl YahooMarketData {
    /// Create a client limited to `requests_per_minute` (default 60)
    pub fn new(requests_per_minute: Option<u32>) -> Self {
        let quota = Quota::per_minute(
            requests_per_minute
                .and_then(NonZeroU32::new)
                .unwrap_or(DEFAULT_REQUESTS_PER_MINUTE),
        );

        Self {
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl MarketDataProvider for YahooMarketData {
    async fn fetch(&self, symbol: &str) -> Result<MarketQuote, MarketDataError> {
        self.rate_limiter.until_ready().await;

        let ticker = provider_symbol(symbol);
        tracing::debug!(symbol, ticker, "Fetching quote from Yahoo Finance");

        let unavailable = |reason: String| MarketDataError::Unavailable {
            symbol: symbol.to_string(),
            reason,
        };

        let provider =
            yahoo::YahooConnector::new().map_err(|e| MarketDataError::Provider(e.to_string()))?;

        let response = provider
            .get_quote_range(&ticker, "1d", "5d")
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let quotes = response.quotes().map_err(|e| unavailable(e.to_string()))?;
        let latest = quotes
            .last()
            .ok_or_else(|| MarketDataError::NoPrice(symbol.to_string()))?;

        if !latest.close.is_finite() || latest.close <= 0.0 {
            return Err(MarketDataError::NoPrice(symbol.to_string()));
        }

        let change_percent = quotes
            .len()
            .checked_sub(2)
            .and_then(|i| quotes.get(i))
            .filter(|previous| previous.close > 0.0)
            .map_or(0.0, |previous| {
                (latest.close - previous.close) / previous.close * 100.0
            });

        Ok(MarketQuote {
            symbol: symbol.to_string(),
            price: latest.close,
            change_percent,
            volume: latest.volume,
            timestamp: DateTime::from_timestamp(latest.timestamp as i64, 0)
                .unwrap_or_else(Utc::now),
        })
    }
}

/// Fixed quotes held in memory
///
/// Backs offline runs of the REPL and the test suites. Symbols without a
/// quote fail with [`MarketDataError::Unavailable`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketData {
    quotes: Arc<RwLock<HashMap<String, MarketQuote>>>,
}

impl InMemoryMarketData {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a quote
    pub fn with_quote(self, symbol: &str, price: f64, change_percent: f64) -> Self {
        self.insert(MarketQuote {
            symbol: symbol.to_string(),
            price,
            change_percent,
            volume: 1_000_000,
            timestamp: Utc::now(),
        });
        self
    }

    /// Add or replace a quote in place
    pub fn insert(&self, quote: MarketQuote) {
        if let Ok(mut quotes) = self.quotes.write() {
            quotes.insert(quote.symbol.clone(), quote);
        }
    }

    /// A provider preloaded with a handful of well-known instruments
    pub fn sample() -> Self {
        Self::new()
            .with_quote("AAPL", 227.52, 0.84)
            .with_quote("MSFT", 415.10, -0.32)
            .with_quote("GOOGL", 171.35, 1.12)
            .with_quote("AMZN", 186.40, 0.57)
            .with_quote("TSLA", 248.90, -2.45)
            .with_quote("NVDA", 121.44, 3.18)
            .with_quote("META", 562.05, 0.21)
            .with_quote("AMD", 153.67, 1.96)
            .with_quote("SPY", 571.30, 0.41)
            .with_quote("QQQ", 487.25, 0.66)
            .with_quote("DIA", 421.80, 0.12)
            .with_quote("BTC", 63_250.0, 2.75)
            .with_quote("ETH", 2_610.0, 1.40)
            .with_quote("GC", 2_655.4, 0.35)
            .with_quote("SI", 31.22, -0.58)
            .with_quote("CL", 71.45, -1.10)
            .with_quote("NG", 2.71, 4.20)
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryMarketData {
    async fn fetch(&self, symbol: &str) -> Result<MarketQuote, MarketDataError> {
        let quotes = self
            .quotes
            .read()
            .map_err(|e| MarketDataError::Provider(format!("Lock error: {e}")))?;

        quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketDataError::Unavailable {
                symbol: symbol.to_string(),
                reason: "no quote on record".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_symbol_mapping() {
        assert_eq!(provider_symbol("BTC"), "BTC-USD");
        assert_eq!(provider_symbol("GC"), "GC=F");
        assert_eq!(provider_symbol("BRK"), "BRK-B");
        assert_eq!(provider_symbol("AAPL"), "AAPL");
    }

    #[tokio::test]
    async fn test_in_memory_provider() {
        let market = InMemoryMarketData::new().with_quote("AAPL", 200.0, 1.5);

        let quote = market.fetch("AAPL").await.unwrap();
        assert_eq!(quote.price, 200.0);
        assert_eq!(quote.change_percent, 1.5);

        let err = market.fetch("MSFT").await.unwrap_err();
        assert_eq!(err.symbol(), Some("MSFT"));
    }

    #[tokio::test]
    async fn test_sample_covers_market_overview() {
        let market = InMemoryMarketData::sample();
        for symbol in ["SPY", "QQQ", "DIA", "BTC"] {
            assert!(market.fetch(symbol).await.is_ok(), "{symbol} missing");
        }
    }

    #[test]
    fn test_quote_serializes_camel_case() {
        let quote = MarketQuote {
            symbol: "AAPL".to_string(),
            price: 1.0,
            change_percent: 2.0,
            volume: 3,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&quote).unwrap();
        assert_eq!(value["changePercent"], 2.0);
    }
}
