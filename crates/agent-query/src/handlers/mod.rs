//! Intent handlers
//!
//! One handler per [`Intent`]. Handlers that need prices go through the
//! [`MarketDataProvider`]; a failed fetch becomes an error-typed response that
//! names the symbol, never a propagated error.

mod analysis;
mod conversational;
mod info;
mod market_overview;
mod portfolio;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::context::Portfolio;
use crate::error::{MarketDataError, Result};
use crate::intent::Intent;
use crate::market::MarketDataProvider;
use crate::response::Response;
use crate::state::ConversationState;

pub use analysis::{ComparisonHandler, StandardAnalysisHandler, TrendAnalysisHandler};
pub use conversational::{CapabilityHandler, DateTimeHandler, GreetingHandler, NonFinancialHandler};
pub use info::{CompanyInfoHandler, EducationalHandler};
pub use market_overview::{MARKET_OVERVIEW_SYMBOLS, MarketOverviewHandler};
pub use portfolio::{CONCENTRATION_WARNING_WEIGHT, PortfolioHandler};

/// Everything a handler gets to work with
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub query: String,
    pub session_id: String,
    /// Symbols injected by the dispatcher
    pub symbols: Vec<String>,
    pub requires_chart: bool,
    /// Conversation state before this request
    pub state: Option<ConversationState>,
    pub portfolio: Option<Portfolio>,
    pub portfolio_metrics: Option<Value>,
    pub now: DateTime<Utc>,
}

impl HandlerContext {
    /// Context for a bare query, mostly useful in tests
    pub fn new(query: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            query: query.into(),
            session_id: String::new(),
            symbols,
            requires_chart: false,
            state: None,
            portfolio: None,
            portfolio_metrics: None,
            now: Utc::now(),
        }
    }

    /// First injected symbol
    pub fn primary_symbol(&self) -> Option<&str> {
        self.symbols.first().map(String::as_str)
    }
}

/// Produces the response for one intent
#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn handle(&self, ctx: &HandlerContext) -> Result<Response>;
}

/// Fixed mapping from intent to handler
#[derive(Clone)]
pub struct HandlerTable {
    handlers: HashMap<Intent, Arc<dyn IntentHandler>>,
}

impl HandlerTable {
    /// The standard handler set backed by `market`
    pub fn standard(market: Arc<dyn MarketDataProvider>) -> Self {
        let mut handlers: HashMap<Intent, Arc<dyn IntentHandler>> = HashMap::new();
        handlers.insert(
            Intent::Comparison,
            Arc::new(ComparisonHandler::new(Arc::clone(&market))),
        );
        handlers.insert(
            Intent::TrendAnalysis,
            Arc::new(TrendAnalysisHandler::new(Arc::clone(&market))),
        );
        handlers.insert(
            Intent::PortfolioAnalysis,
            Arc::new(PortfolioHandler::new(Arc::clone(&market))),
        );
        handlers.insert(
            Intent::MarketOverview,
            Arc::new(MarketOverviewHandler::new(Arc::clone(&market))),
        );
        handlers.insert(Intent::Educational, Arc::new(EducationalHandler));
        handlers.insert(
            Intent::CompanyInfo,
            Arc::new(CompanyInfoHandler::new(Arc::clone(&market))),
        );
        handlers.insert(Intent::Capability, Arc::new(CapabilityHandler));
        handlers.insert(Intent::Greeting, Arc::new(GreetingHandler));
        handlers.insert(
            Intent::StandardAnalysis,
            Arc::new(StandardAnalysisHandler::new(market)),
        );
        handlers.insert(Intent::NonFinancial, Arc::new(NonFinancialHandler));
        handlers.insert(Intent::DateTime, Arc::new(DateTimeHandler));

        Self { handlers }
    }

    /// Replace the handler for one intent
    pub fn with_handler(mut self, intent: Intent, handler: Arc<dyn IntentHandler>) -> Self {
        self.handlers.insert(intent, handler);
        self
    }

    /// Handler registered for `intent`
    pub fn get(&self, intent: Intent) -> Option<Arc<dyn IntentHandler>> {
        self.handlers.get(&intent).cloned()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut intents: Vec<&str> = self.handlers.keys().map(Intent::as_str).collect();
        intents.sort_unstable();
        f.debug_struct("HandlerTable").field("intents", &intents).finish()
    }
}

/// Error response for a failed market data fetch
pub(crate) fn market_failure(symbol: &str, err: &MarketDataError) -> Response {
    tracing::warn!(symbol, error = %err, "Market data fetch failed");
    Response::error(
        format!(
            "I couldn't get market data for {symbol} right now. Please try again in a moment."
        ),
        Some(symbol.to_string()),
    )
}

/// Display label such as "NVIDIA Corporation (NVDA)"
pub(crate) fn label(symbol: &str) -> String {
    match crate::symbols::lexicon::display_name(symbol) {
        Some(name) => format!("{name} ({symbol})"),
        None => symbol.to_string(),
    }
}

/// Format a price with thousands separators
pub(crate) fn format_price(price: f64) -> String {
    let cents = (price.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if price < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// Format a percent change with an explicit sign
pub(crate) fn format_change(change_percent: f64) -> String {
    format!("{change_percent:+.2}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::InMemoryMarketData;

    #[test]
    fn test_standard_table_covers_every_intent() {
        let table = HandlerTable::standard(Arc::new(InMemoryMarketData::new()));
        for intent in Intent::ALL {
            assert!(table.get(intent).is_some(), "{intent} has no handler");
        }
        assert_eq!(table.len(), Intent::ALL.len());
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.5), "$0.50");
        assert_eq!(format_price(121.444), "$121.44");
        assert_eq!(format_price(63_250.0), "$63,250.00");
        assert_eq!(format_price(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_price(-12.0), "-$12.00");
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change(3.181), "+3.18%");
        assert_eq!(format_change(-0.5), "-0.50%");
        assert_eq!(format_change(0.0), "+0.00%");
    }

    #[test]
    fn test_label() {
        assert_eq!(label("NVDA"), "NVIDIA Corporation (NVDA)");
        assert_eq!(label("ZQXW"), "ZQXW");
    }

    #[tokio::test]
    async fn test_with_handler_overrides() {
        struct Fixed;

        #[async_trait]
        impl IntentHandler for Fixed {
            async fn handle(&self, _ctx: &HandlerContext) -> Result<Response> {
                Ok(Response::Greeting {
                    response: "fixed".to_string(),
                })
            }
        }

        let table = HandlerTable::standard(Arc::new(InMemoryMarketData::new()))
            .with_handler(Intent::Greeting, Arc::new(Fixed));
        let handler = table.get(Intent::Greeting).unwrap();
        let response = handler.handle(&HandlerContext::new("hi", Vec::new())).await.unwrap();
        assert_eq!(response.text(), "fixed");
    }
}
