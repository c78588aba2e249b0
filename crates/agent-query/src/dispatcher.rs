//! Intent dispatch and conversation bookkeeping

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::instrument;

use crate::context::RequestContext;
use crate::handlers::{HandlerContext, HandlerTable};
use crate::intent::Intent;
use crate::market::MarketDataProvider;
use crate::resolver::ResolvedQuery;
use crate::response::Response;
use crate::state::{ConversationStore, StatePatch, SymbolDiscussion};

/// Routes resolved queries to their handlers and records the outcome
pub struct ResponseDispatcher {
    handlers: HandlerTable,
}

impl ResponseDispatcher {
    /// Dispatcher over the standard handler table
    pub fn new(market: Arc<dyn MarketDataProvider>) -> Self {
        Self::with_handlers(HandlerTable::standard(market))
    }

    pub fn with_handlers(handlers: HandlerTable) -> Self {
        Self { handlers }
    }

    /// Produce the response for a resolved query
    ///
    /// Missing symbols yield a clarification. Handler failures become an
    /// error response and, like every error response, leave the conversation
    /// state untouched.
    #[instrument(skip_all, fields(session_id = %context.session_id, intent = %resolved.intent))]
    pub async fn dispatch(
        &self,
        resolved: &ResolvedQuery,
        context: &RequestContext,
        store: &ConversationStore,
    ) -> Response {
        if resolved.symbols.len() < resolved.intent.min_symbols() {
            tracing::debug!(symbols = ?resolved.symbols, "Not enough symbols, asking the user");
            return clarification(resolved);
        }

        let Some(handler) = self.handlers.get(resolved.intent) else {
            tracing::warn!("No handler registered");
            return Response::error(
                "I can't answer that kind of question yet.",
                resolved.symbols.first().cloned(),
            );
        };

        let ctx = HandlerContext {
            query: resolved.query.clone(),
            session_id: context.session_id.clone(),
            symbols: resolved.symbols.clone(),
            requires_chart: resolved.requires_chart,
            state: store.get(&context.session_id),
            portfolio: context.portfolio.clone(),
            portfolio_metrics: context.portfolio_metrics.clone(),
            now: Utc::now(),
        };

        let response = match handler.handle(&ctx).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Handler failed");
                Response::error(
                    "Something went wrong while answering that. Please try again.",
                    resolved.symbols.first().cloned(),
                )
            }
        };

        self.record(&context.session_id, &resolved.query, &resolved.symbols, &response, store);
        response
    }

    /// Write a response's outcome into the session's state
    ///
    /// Error and clarification responses are not recorded.
    pub fn record(
        &self,
        session_id: &str,
        query: &str,
        resolved_symbols: &[String],
        response: &Response,
        store: &ConversationStore,
    ) {
        let Some(intent) = response.intent() else {
            return;
        };
        store.update(session_id, |_| state_patch(query, resolved_symbols, intent, response));
    }
}

/// State changes implied by a successful response
pub fn state_patch(
    query: &str,
    resolved_symbols: &[String],
    intent: Intent,
    response: &Response,
) -> StatePatch {
    let last_symbol = response
        .symbol()
        .map(str::to_string)
        .or_else(|| response.symbols().first().cloned())
        .or_else(|| resolved_symbols.first().cloned());

    let mentioned: Vec<String> = match response.symbol() {
        Some(symbol) => vec![symbol.to_string()],
        None if !response.symbols().is_empty() => response.symbols().to_vec(),
        None => resolved_symbols.to_vec(),
    };

    let now = Utc::now();
    let discussions = mentioned
        .iter()
        .map(|symbol| {
            let discussion = SymbolDiscussion {
                last_price: price_for(response.data(), symbol),
                analysis_kind: intent,
                chart_shown: response.needs_chart() && response.symbol() == Some(symbol.as_str()),
                last_discussed_at: now,
            };
            (symbol.clone(), discussion)
        })
        .collect();

    let (charts_shown, promises) = match response.symbol() {
        Some(symbol) if response.needs_chart() => {
            (vec![symbol.to_string()], vec![format!("chart:{symbol}")])
        }
        _ => (Vec::new(), Vec::new()),
    };

    StatePatch {
        active_symbol: last_symbol,
        last_intent: Some(intent),
        last_discussed_topic: Some(query.to_string()),
        discussions,
        charts_shown,
        promises,
    }
}

/// Price reported for `symbol` in a response's data payload
fn price_for(data: Option<&Value>, symbol: &str) -> Option<f64> {
    let data = data?;
    if data.get("symbol").and_then(Value::as_str) == Some(symbol) {
        return data.get("price").and_then(Value::as_f64);
    }

    ["quotes", "positions"]
        .iter()
        .filter_map(|field| data.get(*field).and_then(Value::as_array))
        .flatten()
        .find(|entry| entry.get("symbol").and_then(Value::as_str) == Some(symbol))
        .and_then(|entry| entry.get("price").and_then(Value::as_f64))
}

fn clarification(resolved: &ResolvedQuery) -> Response {
    let text = match (resolved.intent, resolved.symbols.first()) {
        (Intent::Comparison, Some(symbol)) => {
            format!("What would you like to compare {symbol} with?")
        }
        (Intent::Comparison, None) => "Which two instruments would you like to compare?".to_string(),
        (Intent::TrendAnalysis, _) => {
            "Which stock, crypto or commodity should I chart? For example: NVDA, bitcoin or gold."
                .to_string()
        }
        _ => "Which stock, crypto or commodity do you mean? For example: AAPL, bitcoin or gold."
            .to_string(),
    };

    Response::clarification(text, resolved.symbols.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{QueryError, Result};
    use crate::handlers::IntentHandler;
    use crate::market::InMemoryMarketData;
    use crate::resolver::ResolutionSource;
    use async_trait::async_trait;
    use serde_json::json;

    fn resolved(query: &str, intent: Intent, symbols: &[&str]) -> ResolvedQuery {
        ResolvedQuery {
            query: query.to_string(),
            intent,
            symbols: symbols.iter().map(|s| (*s).to_string()).collect(),
            is_financial: true,
            requires_chart: false,
            source: ResolutionSource::Fallback,
            confidence: None,
            used_context: false,
        }
    }

    fn setup() -> (ResponseDispatcher, ConversationStore, RequestContext) {
        let dispatcher = ResponseDispatcher::new(Arc::new(InMemoryMarketData::sample()));
        let store = ConversationStore::new();
        store.get_or_create("s1");
        (dispatcher, store, RequestContext::new("s1"))
    }

    #[tokio::test]
    async fn test_missing_symbol_asks_for_clarification() {
        let (dispatcher, store, context) = setup();
        let response = dispatcher
            .dispatch(&resolved("price?", Intent::StandardAnalysis, &[]), &context, &store)
            .await;

        assert_eq!(response.kind(), "clarification");
        assert!(store.get("s1").unwrap().last_intent.is_none());
    }

    #[tokio::test]
    async fn test_comparison_with_one_symbol_asks_for_second() {
        let (dispatcher, store, context) = setup();
        let response = dispatcher
            .dispatch(&resolved("compare NVDA", Intent::Comparison, &["NVDA"]), &context, &store)
            .await;

        assert_eq!(response.kind(), "clarification");
        assert!(response.text().contains("compare NVDA with"));
    }

    #[tokio::test]
    async fn test_success_updates_state() {
        let (dispatcher, store, context) = setup();
        let response = dispatcher
            .dispatch(&resolved("NVDA price", Intent::StandardAnalysis, &["NVDA"]), &context, &store)
            .await;
        assert_eq!(response.symbol(), Some("NVDA"));

        let state = store.get("s1").unwrap();
        assert_eq!(state.active_symbol.as_deref(), Some("NVDA"));
        assert_eq!(state.last_intent, Some(Intent::StandardAnalysis));
        assert_eq!(state.last_discussed_topic.as_deref(), Some("NVDA price"));
        assert_eq!(state.discussed_symbols["NVDA"].last_price, Some(121.44));
    }

    #[tokio::test]
    async fn test_trend_records_chart_and_promise() {
        let (dispatcher, store, context) = setup();
        let response = dispatcher
            .dispatch(&resolved("BTC chart", Intent::TrendAnalysis, &["BTC"]), &context, &store)
            .await;
        assert!(response.needs_chart());

        let state = store.get("s1").unwrap();
        assert!(state.chart_shown("BTC"));
        assert!(state.discussed_symbols["BTC"].chart_shown);
        assert!(state.promises_made.contains("chart:BTC"));

        let response = dispatcher
            .dispatch(&resolved("BTC trend", Intent::TrendAnalysis, &["BTC"]), &context, &store)
            .await;
        assert!(!response.needs_chart());
    }

    #[tokio::test]
    async fn test_plural_response_sets_first_symbol() {
        let (dispatcher, store, context) = setup();
        dispatcher
            .dispatch(&resolved("AAPL vs MSFT", Intent::Comparison, &["AAPL", "MSFT"]), &context, &store)
            .await;

        let state = store.get("s1").unwrap();
        assert_eq!(state.active_symbol.as_deref(), Some("AAPL"));
        assert_eq!(state.discussed_symbols["MSFT"].last_price, Some(415.10));
    }

    #[tokio::test]
    async fn test_symbol_free_response_keeps_active_symbol() {
        let (dispatcher, store, context) = setup();
        dispatcher
            .dispatch(&resolved("NVDA price", Intent::StandardAnalysis, &["NVDA"]), &context, &store)
            .await;
        dispatcher
            .dispatch(&resolved("hello", Intent::Greeting, &[]), &context, &store)
            .await;

        let state = store.get("s1").unwrap();
        assert_eq!(state.active_symbol.as_deref(), Some("NVDA"));
        assert_eq!(state.last_intent, Some(Intent::Greeting));
    }

    #[tokio::test]
    async fn test_handler_failure_leaves_state_untouched() {
        struct Broken;

        #[async_trait]
        impl IntentHandler for Broken {
            async fn handle(&self, _ctx: &HandlerContext) -> Result<Response> {
                Err(QueryError::Other("boom".to_string()))
            }
        }

        let table = HandlerTable::standard(Arc::new(InMemoryMarketData::sample()))
            .with_handler(Intent::StandardAnalysis, Arc::new(Broken));
        let dispatcher = ResponseDispatcher::with_handlers(table);
        let store = ConversationStore::new();
        store.get_or_create("s1");

        let response = dispatcher
            .dispatch(
                &resolved("AAPL price", Intent::StandardAnalysis, &["AAPL"]),
                &RequestContext::new("s1"),
                &store,
            )
            .await;

        assert!(response.is_error());
        assert_eq!(response.symbol(), Some("AAPL"));
        assert!(store.get("s1").unwrap().active_symbol.is_none());
    }

    #[tokio::test]
    async fn test_market_failure_leaves_state_untouched() {
        let (dispatcher, store, context) = setup();
        let response = dispatcher
            .dispatch(&resolved("ZZZZ price", Intent::StandardAnalysis, &["ZZZZ"]), &context, &store)
            .await;

        assert!(response.is_error());
        assert!(store.get("s1").unwrap().discussed_symbols.is_empty());
    }

    #[test]
    fn test_price_for_nested_quotes() {
        let data = json!({"quotes": [{"symbol": "AAPL", "price": 1.0}, {"symbol": "MSFT", "price": 2.0}]});
        assert_eq!(price_for(Some(&data), "MSFT"), Some(2.0));
        assert_eq!(price_for(Some(&data), "TSLA"), None);
        assert_eq!(price_for(None, "AAPL"), None);
    }
}
