//! Conversational query resolution for a finance assistant
//!
//! Turns a free-text message into a typed response in four steps:
//!
//! - Symbol extraction: conservative, stopword-driven ticker recognition with
//!   natural-language names ("bitcoin", "natural gas") and single-edit fuzzy
//!   correction
//! - Resolution: an LLM analyzer first, deterministic fallback rules on any
//!   analyzer failure, then a context merge that resolves vague follow-ups to
//!   the session's last discussed symbol
//! - Dispatch: one handler per intent, with conversation state written only
//!   after a handler succeeds
//! - Caching: a TTL + FIFO response cache whose keys are scoped to the session
//!   for vague queries
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_query::{FinanceBot, InMemoryMarketData, RequestContext};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = FinanceBot::builder()
//!         .market(Arc::new(InMemoryMarketData::sample()))
//!         .build()?;
//!
//!     let context = RequestContext::new("session-1");
//!     let first = bot.resolve_and_respond("NVDA price", &context).await;
//!     let follow_up = bot.resolve_and_respond("trend?", &context).await;
//!     assert_eq!(follow_up.symbol(), Some("NVDA"));
//!
//!     println!("{}\n{}", first.text(), follow_up.text());
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod bot;
pub mod cache;
pub mod config;
pub mod context;
pub mod detectors;
pub mod dispatcher;
pub mod error;
pub mod followup;
pub mod glossary;
pub mod handlers;
pub mod intent;
pub mod market;
pub mod resolver;
pub mod response;
pub mod rules;
pub mod state;
pub mod symbols;

// Re-export main types for convenience
pub use analyzer::{
    AnalysisRequest, AnalyzerVerdict, LlmAnalyzerConfig, LlmQueryAnalyzer, QueryAnalyzer,
    UnavailableAnalyzer,
};
pub use bot::{FinanceBot, FinanceBotBuilder};
pub use cache::ResponseCache;
pub use config::{QueryConfig, QueryConfigBuilder, ResolutionPolicy};
pub use context::{HistoryTurn, Holding, Portfolio, RequestContext};
pub use detectors::{NonFinancialDetector, PortfolioDetector};
pub use dispatcher::ResponseDispatcher;
pub use error::{AnalyzerError, MarketDataError, QueryError, Result};
pub use handlers::{HandlerContext, HandlerTable, IntentHandler};
pub use intent::Intent;
pub use market::{InMemoryMarketData, MarketDataProvider, MarketQuote, YahooMarketData};
pub use resolver::{QueryResolver, ResolutionSource, ResolvedQuery};
pub use response::Response;
pub use rules::{FALLBACK_RULES, IntentClassifier, IntentRule, RuleMatch};
pub use state::{ConversationState, ConversationStore, StatePatch, SymbolDiscussion, SymbolStage};
pub use symbols::{SymbolExtractor, extract_safe_symbols};
