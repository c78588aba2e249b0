//! Broad market snapshot

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::json;

use super::{HandlerContext, IntentHandler, format_change, format_price, label};
use crate::error::Result;
use crate::market::{MarketDataProvider, MarketQuote};
use crate::response::Response;

/// Benchmarks summarized by the overview
pub const MARKET_OVERVIEW_SYMBOLS: &[&str] = &["SPY", "QQQ", "DIA", "BTC"];

fn mood(average_change: f64) -> &'static str {
    if average_change >= 1.0 {
        "Markets are broadly higher"
    } else if average_change > 0.0 {
        "Markets are modestly positive"
    } else if average_change > -1.0 {
        "Markets are modestly negative"
    } else {
        "Markets are broadly lower"
    }
}

/// Summarizes the major benchmarks, tolerating partial failures
pub struct MarketOverviewHandler {
    market: Arc<dyn MarketDataProvider>,
}

impl MarketOverviewHandler {
    pub fn new(market: Arc<dyn MarketDataProvider>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl IntentHandler for MarketOverviewHandler {
    async fn handle(&self, _ctx: &HandlerContext) -> Result<Response> {
        let results = join_all(
            MARKET_OVERVIEW_SYMBOLS
                .iter()
                .map(|symbol| self.market.fetch(symbol)),
        )
        .await;

        let mut quotes: Vec<MarketQuote> = Vec::new();
        let mut missing = Vec::new();
        for (symbol, result) in MARKET_OVERVIEW_SYMBOLS.iter().zip(results) {
            match result {
                Ok(quote) => quotes.push(quote),
                Err(e) => {
                    tracing::warn!(symbol, error = %e, "Benchmark unavailable");
                    missing.push((*symbol).to_string());
                }
            }
        }

        if quotes.is_empty() {
            return Ok(Response::error(
                "Market data is unavailable right now. Please try again in a moment.",
                None,
            ));
        }

        let average = quotes.iter().map(|q| q.change_percent).sum::<f64>() / quotes.len() as f64;
        let mut lines = vec![format!("{} today.", mood(average))];
        for quote in &quotes {
            lines.push(format!(
                "{}: {} ({})",
                label(&quote.symbol),
                format_price(quote.price),
                format_change(quote.change_percent)
            ));
        }
        if !missing.is_empty() {
            lines.push(format!("Not available: {}.", missing.join(", ")));
        }

        Ok(Response::MarketOverview {
            response: lines.join("\n"),
            symbols: quotes.iter().map(|q| q.symbol.clone()).collect(),
            data: Some(json!({
                "quotes": quotes,
                "averageChangePercent": average,
                "missing": missing,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::InMemoryMarketData;

    #[tokio::test]
    async fn test_overview_with_all_benchmarks() {
        let handler = MarketOverviewHandler::new(Arc::new(InMemoryMarketData::sample()));
        let response = handler
            .handle(&HandlerContext::new("how's the market", Vec::new()))
            .await
            .unwrap();

        assert_eq!(response.kind(), "market_overview");
        assert_eq!(response.symbols().len(), MARKET_OVERVIEW_SYMBOLS.len());
    }

    #[tokio::test]
    async fn test_overview_tolerates_partial_failure() {
        let market = InMemoryMarketData::new()
            .with_quote("SPY", 500.0, 1.5)
            .with_quote("QQQ", 450.0, 2.0);
        let handler = MarketOverviewHandler::new(Arc::new(market));
        let response = handler
            .handle(&HandlerContext::new("market today", Vec::new()))
            .await
            .unwrap();

        assert!(!response.is_error());
        assert_eq!(response.symbols(), ["SPY".to_string(), "QQQ".to_string()]);
        assert!(response.text().starts_with("Markets are broadly higher"));
        assert!(response.text().contains("Not available: DIA, BTC."));
    }

    #[tokio::test]
    async fn test_overview_total_failure() {
        let handler = MarketOverviewHandler::new(Arc::new(InMemoryMarketData::new()));
        let response = handler
            .handle(&HandlerContext::new("market today", Vec::new()))
            .await
            .unwrap();
        assert!(response.is_error());
    }
}
