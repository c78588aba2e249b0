//! The inbound entry point

use std::sync::Arc;

use tracing::instrument;

use crate::analyzer::{QueryAnalyzer, UnavailableAnalyzer};
use crate::cache::ResponseCache;
use crate::config::QueryConfig;
use crate::context::RequestContext;
use crate::dispatcher::ResponseDispatcher;
use crate::handlers::HandlerTable;
use crate::market::{MarketDataProvider, YahooMarketData};
use crate::resolver::QueryResolver;
use crate::response::Response;
use crate::state::ConversationStore;

/// Cache key type for whole-query responses
const QUERY_CACHE_KIND: &str = "query";

/// Resolves messages and answers them, one session at a time
///
/// Owns the conversation store and response cache; both live as long as the
/// bot does.
pub struct FinanceBot {
    store: ConversationStore,
    cache: ResponseCache,
    resolver: QueryResolver,
    dispatcher: ResponseDispatcher,
}

impl FinanceBot {
    /// Create a new bot builder
    pub fn builder() -> FinanceBotBuilder {
        FinanceBotBuilder::default()
    }

    /// Answer `message` for the session in `context`
    ///
    /// Runs session creation, cache lookup, resolution, dispatch and the
    /// cache write, in that order.
    #[instrument(skip(self, context), fields(session_id = %context.session_id))]
    pub async fn resolve_and_respond(&self, message: &str, context: &RequestContext) -> Response {
        let session_id = context.session_id.as_str();
        self.store.get_or_create(session_id);

        let key = ResponseCache::key(message, QUERY_CACHE_KIND, session_id);
        if let Some(cached) = self.cache.get(&key).await {
            self.dispatcher.record(session_id, message, &[], &cached, &self.store);
            return cached;
        }

        let resolved = self.resolver.resolve(message, context, &self.store).await;
        let response = self.dispatcher.dispatch(&resolved, context, &self.store).await;

        if ResponseCache::should_cache(&resolved, &response) {
            self.cache.set(key, response.clone()).await;
        }

        response
    }

    /// The conversation store
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// The response cache
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}

/// Builder for [`FinanceBot`]
#[derive(Default)]
pub struct FinanceBotBuilder {
    analyzer: Option<Arc<dyn QueryAnalyzer>>,
    market: Option<Arc<dyn MarketDataProvider>>,
    handlers: Option<HandlerTable>,
    config: Option<QueryConfig>,
}

impl FinanceBotBuilder {
    /// Analyzer consulted first (default: none, always fall back)
    pub fn analyzer(mut self, analyzer: Arc<dyn QueryAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Market data behind the standard handlers (default: Yahoo Finance)
    pub fn market(mut self, market: Arc<dyn MarketDataProvider>) -> Self {
        self.market = Some(market);
        self
    }

    /// Replace the whole handler table
    pub fn handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = Some(handlers);
        self
    }

    pub fn config(mut self, config: QueryConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the bot
    pub fn build(self) -> crate::error::Result<FinanceBot> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let analyzer = self
            .analyzer
            .unwrap_or_else(|| Arc::new(UnavailableAnalyzer));
        let handlers = match (self.handlers, self.market) {
            (Some(handlers), _) => handlers,
            (None, Some(market)) => HandlerTable::standard(market),
            (None, None) => HandlerTable::standard(Arc::new(YahooMarketData::default())),
        };

        Ok(FinanceBot {
            store: ConversationStore::new(),
            cache: ResponseCache::from_config(&config),
            resolver: QueryResolver::new(analyzer, config),
            dispatcher: ResponseDispatcher::with_handlers(handlers),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::InMemoryMarketData;

    fn bot() -> FinanceBot {
        FinanceBot::builder()
            .market(Arc::new(InMemoryMarketData::sample()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_creates_session_on_first_message() {
        let bot = bot();
        bot.resolve_and_respond("hello", &RequestContext::new("s1")).await;
        assert!(bot.store().get("s1").is_some());
    }

    #[tokio::test]
    async fn test_caches_plain_queries() {
        let bot = bot();
        let response = bot
            .resolve_and_respond("AAPL price", &RequestContext::new("s1"))
            .await;
        assert_eq!(response.symbol(), Some("AAPL"));
        assert_eq!(bot.cache().len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_hit_still_updates_session_state() {
        let bot = bot();
        bot.resolve_and_respond("AAPL price", &RequestContext::new("a")).await;
        bot.resolve_and_respond("AAPL price", &RequestContext::new("b")).await;

        let state = bot.store().get("b").unwrap();
        assert_eq!(state.active_symbol.as_deref(), Some("AAPL"));
    }

    #[tokio::test]
    async fn test_does_not_cache_vague_or_trend() {
        let bot = bot();
        let context = RequestContext::new("s1");
        bot.resolve_and_respond("NVDA chart", &context).await;
        bot.resolve_and_respond("price?", &context).await;
        assert!(bot.cache().is_empty().await);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = QueryConfig {
            cache_max_entries: 0,
            ..Default::default()
        };
        assert!(FinanceBot::builder().config(config).build().is_err());
    }
}
