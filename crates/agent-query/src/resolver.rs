//! Two-tier query resolution
//!
//! The analyzer is asked first. Any [`AnalyzerError`] (including a timeout or a
//! verdict below the confidence gate) switches to the fallback rules and the
//! safe symbol extractor. Either way the result then goes through the context
//! merge, which fills a missing symbol from the session's last discussed
//! symbol whenever the intent needs one and the query names none.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::analyzer::{AnalysisRequest, AnalyzerVerdict, QueryAnalyzer};
use crate::config::QueryConfig;
use crate::context::RequestContext;
use crate::error::AnalyzerError;
use crate::followup;
use crate::intent::Intent;
use crate::rules::IntentClassifier;
use crate::state::{ConversationState, ConversationStore};
use crate::symbols::SymbolExtractor;

/// Which tier produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Analyzer,
    Fallback,
}

/// Intent and symbols for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedQuery {
    /// Raw query text
    pub query: String,
    pub intent: Intent,
    /// Ordered, unique symbols
    pub symbols: Vec<String>,
    pub is_financial: bool,
    pub requires_chart: bool,
    pub source: ResolutionSource,
    /// Analyzer confidence, when it reported one
    pub confidence: Option<f64>,
    /// Whether a symbol came from conversation state
    pub used_context: bool,
}

/// Resolves raw queries into intent and symbols
pub struct QueryResolver {
    analyzer: Arc<dyn QueryAnalyzer>,
    classifier: IntentClassifier,
    extractor: SymbolExtractor,
    config: QueryConfig,
}

impl QueryResolver {
    /// Create a resolver around an analyzer
    pub fn new(analyzer: Arc<dyn QueryAnalyzer>, config: QueryConfig) -> Self {
        Self {
            analyzer,
            classifier: IntentClassifier::new(&config),
            extractor: SymbolExtractor::new(),
            config,
        }
    }

    /// Resolve `query` for the session named in `context`
    ///
    /// Never fails: analyzer errors are recovered locally and a missing
    /// symbol is left for the dispatcher to turn into a clarification.
    #[instrument(skip(self, context, store), fields(session_id = %context.session_id))]
    pub async fn resolve(
        &self,
        query: &str,
        context: &RequestContext,
        store: &ConversationStore,
    ) -> ResolvedQuery {
        let state = store.get(&context.session_id);
        let request = AnalysisRequest {
            query: query.to_string(),
            history: context.conversation_history.clone(),
            state: state.clone(),
        };

        let mut resolved = match self.analyze(&request).await {
            Ok(verdict) => Self::from_verdict(query, verdict),
            Err(e) => {
                tracing::warn!(error = %e, "Analyzer failed, using fallback rules");
                self.fallback(query)
            }
        };

        self.merge_context(&mut resolved, state.as_ref(), context);

        tracing::debug!(
            intent = %resolved.intent,
            symbols = ?resolved.symbols,
            source = ?resolved.source,
            used_context = resolved.used_context,
            "Query resolved"
        );
        resolved
    }

    /// Call the analyzer under the configured timeout and confidence gate
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzerVerdict, AnalyzerError> {
        let timeout = self.config.analyzer_timeout;
        let verdict =
            match tokio::time::timeout(timeout, self.analyzer.analyze_query(request)).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(?timeout, "Analyzer timed out");
                    return Err(AnalyzerError::Timeout(timeout));
                }
            };

        if let (Some(minimum), Some(confidence)) =
            (self.config.min_analyzer_confidence, verdict.confidence)
        {
            if confidence < minimum {
                return Err(AnalyzerError::LowConfidence {
                    confidence,
                    minimum,
                });
            }
        }

        Ok(verdict)
    }

    fn from_verdict(query: &str, verdict: AnalyzerVerdict) -> ResolvedQuery {
        let intent = if !verdict.is_financial && !verdict.intent.is_conversational() {
            Intent::NonFinancial
        } else if verdict.requires_chart {
            Intent::TrendAnalysis
        } else {
            verdict.intent
        };

        ResolvedQuery {
            query: query.to_string(),
            intent,
            symbols: normalize_symbols(verdict.symbols),
            is_financial: verdict.is_financial,
            requires_chart: verdict.requires_chart,
            source: ResolutionSource::Analyzer,
            confidence: verdict.confidence,
            used_context: false,
        }
    }

    /// Local rules plus the safe symbol extractor
    pub fn fallback(&self, query: &str) -> ResolvedQuery {
        let symbols = self.extractor.extract(query);
        let matched = self.classifier.classify(query, &symbols);

        ResolvedQuery {
            query: query.to_string(),
            intent: matched.intent,
            symbols,
            is_financial: matched.intent != Intent::NonFinancial,
            requires_chart: matched.requires_chart,
            source: ResolutionSource::Fallback,
            confidence: None,
            used_context: false,
        }
    }

    /// Fill in symbols a follow-up leaves implicit
    ///
    /// Order: symbols named in the query, then the session's last discussed
    /// symbol, then the caller's topic hint. The hint is only read for vague
    /// or anaphoric queries, and only when the policy allows it.
    fn merge_context(
        &self,
        resolved: &mut ResolvedQuery,
        state: Option<&ConversationState>,
        context: &RequestContext,
    ) {
        let last = state.and_then(|s| {
            s.last_discussed_symbol
                .as_deref()
                .or(s.active_symbol.as_deref())
        });
        let query = resolved.query.as_str();

        if resolved.symbols.is_empty() && resolved.intent.requires_symbol() {
            if let Some(symbol) = last {
                resolved.symbols.push(symbol.to_string());
                resolved.used_context = true;
            } else if self.config.policy.topic_hint_for_vague_queries
                && followup::is_follow_up(query)
            {
                if let Some(topic) = context.topic.as_deref() {
                    resolved.symbols = self.extractor.extract(topic);
                    resolved.used_context = !resolved.symbols.is_empty();
                }
            }
            return;
        }

        if resolved.intent == Intent::Comparison
            && resolved.symbols.len() == 1
            && followup::is_anaphoric(query)
        {
            if let Some(symbol) = last {
                if !resolved.symbols.iter().any(|s| s == symbol) {
                    resolved.symbols.insert(0, symbol.to_string());
                    resolved.used_context = true;
                }
            }
        }
    }
}

/// Upper-case, trim and de-duplicate analyzer symbols, keeping order
fn normalize_symbols(symbols: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    symbols
        .into_iter()
        .map(|s| s.trim().trim_start_matches('$').to_ascii_uppercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::MockQueryAnalyzer;
    use crate::state::StatePatch;
    use std::time::Duration;

    fn verdict(intent: Intent, symbols: &[&str]) -> AnalyzerVerdict {
        AnalyzerVerdict {
            is_financial: true,
            intent,
            symbols: symbols.iter().map(|s| (*s).to_string()).collect(),
            requires_chart: false,
            confidence: Some(0.9),
        }
    }

    fn failing_analyzer() -> MockQueryAnalyzer {
        let mut analyzer = MockQueryAnalyzer::new();
        analyzer
            .expect_analyze_query()
            .returning(|_| Err(AnalyzerError::Unavailable("offline".to_string())));
        analyzer
    }

    fn store_with_last_symbol(session: &str, symbol: &str) -> ConversationStore {
        let store = ConversationStore::new();
        store.get_or_create(session);
        store.update(session, |_| StatePatch {
            active_symbol: Some(symbol.to_string()),
            ..Default::default()
        });
        store
    }

    #[tokio::test]
    async fn test_analyzer_verdict_is_trusted() {
        let mut analyzer = MockQueryAnalyzer::new();
        analyzer
            .expect_analyze_query()
            .times(1)
            .returning(|_| Ok(verdict(Intent::Comparison, &["aapl", "MSFT", "AAPL"])));

        let resolver = QueryResolver::new(Arc::new(analyzer), QueryConfig::default());
        let resolved = resolver
            .resolve("apple or microsoft?", &RequestContext::new("s1"), &ConversationStore::new())
            .await;

        assert_eq!(resolved.source, ResolutionSource::Analyzer);
        assert_eq!(resolved.intent, Intent::Comparison);
        assert_eq!(resolved.symbols, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn test_requires_chart_forces_trend() {
        let mut analyzer = MockQueryAnalyzer::new();
        analyzer.expect_analyze_query().returning(|_| {
            Ok(AnalyzerVerdict {
                requires_chart: true,
                ..verdict(Intent::StandardAnalysis, &["BTC"])
            })
        });

        let resolver = QueryResolver::new(Arc::new(analyzer), QueryConfig::default());
        let resolved = resolver
            .resolve("bitcoin chart", &RequestContext::new("s1"), &ConversationStore::new())
            .await;
        assert_eq!(resolved.intent, Intent::TrendAnalysis);
        assert!(resolved.requires_chart);
    }

    #[tokio::test]
    async fn test_not_financial_verdict_maps_to_refusal() {
        let mut analyzer = MockQueryAnalyzer::new();
        analyzer.expect_analyze_query().returning(|_| {
            Ok(AnalyzerVerdict {
                is_financial: false,
                ..verdict(Intent::StandardAnalysis, &[])
            })
        });

        let resolver = QueryResolver::new(Arc::new(analyzer), QueryConfig::default());
        let resolved = resolver
            .resolve("best pasta recipe", &RequestContext::new("s1"), &ConversationStore::new())
            .await;
        assert_eq!(resolved.intent, Intent::NonFinancial);
    }

    #[tokio::test]
    async fn test_analyzer_failure_uses_fallback() {
        let resolver = QueryResolver::new(Arc::new(failing_analyzer()), QueryConfig::default());
        let resolved = resolver
            .resolve("AAPL vs MSFT", &RequestContext::new("s1"), &ConversationStore::new())
            .await;

        assert_eq!(resolved.source, ResolutionSource::Fallback);
        assert_eq!(resolved.intent, Intent::Comparison);
        assert_eq!(resolved.symbols, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyzer_timeout_uses_fallback() {
        struct Slow;

        #[async_trait::async_trait]
        impl QueryAnalyzer for Slow {
            async fn analyze_query(
                &self,
                _request: &AnalysisRequest,
            ) -> Result<AnalyzerVerdict, AnalyzerError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(verdict(Intent::Greeting, &[]))
            }
        }

        let config = QueryConfig {
            analyzer_timeout: Duration::from_secs(1),
            ..Default::default()
        };
        let resolver = QueryResolver::new(Arc::new(Slow), config);
        let resolved = resolver
            .resolve("NVDA price", &RequestContext::new("s1"), &ConversationStore::new())
            .await;

        assert_eq!(resolved.source, ResolutionSource::Fallback);
        assert_eq!(resolved.symbols, vec!["NVDA"]);
    }

    #[tokio::test]
    async fn test_low_confidence_uses_fallback() {
        let mut analyzer = MockQueryAnalyzer::new();
        analyzer.expect_analyze_query().returning(|_| {
            Ok(AnalyzerVerdict {
                confidence: Some(0.2),
                ..verdict(Intent::Greeting, &[])
            })
        });

        let config = QueryConfig {
            min_analyzer_confidence: Some(0.5),
            ..Default::default()
        };
        let resolver = QueryResolver::new(Arc::new(analyzer), config);
        let resolved = resolver
            .resolve("TSLA price", &RequestContext::new("s1"), &ConversationStore::new())
            .await;
        assert_eq!(resolved.source, ResolutionSource::Fallback);
        assert_eq!(resolved.intent, Intent::StandardAnalysis);
    }

    #[tokio::test]
    async fn test_vague_query_ignores_stale_topic() {
        let store = store_with_last_symbol("s1", "NVDA");
        let context = RequestContext::new("s1").with_topic("TSLA");

        let resolver = QueryResolver::new(Arc::new(failing_analyzer()), QueryConfig::default());
        let resolved = resolver.resolve("what's the trend?", &context, &store).await;

        assert_eq!(resolved.intent, Intent::TrendAnalysis);
        assert_eq!(resolved.symbols, vec!["NVDA"]);
        assert!(resolved.used_context);
    }

    #[tokio::test]
    async fn test_any_symbol_free_follow_up_uses_last_symbol() {
        let store = store_with_last_symbol("s1", "NVDA");
        let resolver = QueryResolver::new(Arc::new(failing_analyzer()), QueryConfig::default());

        for query in ["what's the trend looking like?", "show me the chart for today"] {
            let resolved = resolver.resolve(query, &RequestContext::new("s1"), &store).await;
            assert_eq!(resolved.intent, Intent::TrendAnalysis, "{query}");
            assert_eq!(resolved.symbols, vec!["NVDA"], "{query}");
            assert!(resolved.used_context);
        }
    }

    #[tokio::test]
    async fn test_topic_hint_needs_a_follow_up() {
        let store = ConversationStore::new();
        store.get_or_create("s1");
        let context = RequestContext::new("s1").with_topic("TSLA");

        let mut config = QueryConfig::default();
        config.policy.topic_hint_for_vague_queries = true;
        let resolver = QueryResolver::new(Arc::new(failing_analyzer()), config);
        let resolved = resolver.resolve("show me the chart for today", &context, &store).await;
        assert!(resolved.symbols.is_empty());
    }

    #[tokio::test]
    async fn test_topic_hint_only_when_policy_allows() {
        let store = ConversationStore::new();
        store.get_or_create("s1");
        let context = RequestContext::new("s1").with_topic("TSLA");

        let resolver = QueryResolver::new(Arc::new(failing_analyzer()), QueryConfig::default());
        let resolved = resolver.resolve("trend?", &context, &store).await;
        assert!(resolved.symbols.is_empty());

        let mut config = QueryConfig::default();
        config.policy.topic_hint_for_vague_queries = true;
        let resolver = QueryResolver::new(Arc::new(failing_analyzer()), config);
        let resolved = resolver.resolve("trend?", &context, &store).await;
        assert_eq!(resolved.symbols, vec!["TSLA"]);
    }

    #[tokio::test]
    async fn test_explicit_symbol_beats_context() {
        let store = store_with_last_symbol("s1", "NVDA");
        let resolver = QueryResolver::new(Arc::new(failing_analyzer()), QueryConfig::default());
        let resolved = resolver
            .resolve("AAPL trend", &RequestContext::new("s1"), &store)
            .await;
        assert_eq!(resolved.symbols, vec!["AAPL"]);
        assert!(!resolved.used_context);
    }

    #[tokio::test]
    async fn test_comparison_anaphora_prepends_last_symbol() {
        let store = store_with_last_symbol("s1", "NVDA");
        let resolver = QueryResolver::new(Arc::new(failing_analyzer()), QueryConfig::default());
        let resolved = resolver
            .resolve("compare it with AMD", &RequestContext::new("s1"), &store)
            .await;

        assert_eq!(resolved.intent, Intent::Comparison);
        assert_eq!(resolved.symbols, vec!["NVDA", "AMD"]);
    }

    #[tokio::test]
    async fn test_analyzer_sees_conversation_state() {
        let store = store_with_last_symbol("s1", "NVDA");
        let mut analyzer = MockQueryAnalyzer::new();
        analyzer
            .expect_analyze_query()
            .withf(|request| {
                request
                    .state
                    .as_ref()
                    .and_then(|s| s.active_symbol.as_deref())
                    == Some("NVDA")
            })
            .returning(|_| Ok(verdict(Intent::TrendAnalysis, &[])));

        let resolver = QueryResolver::new(Arc::new(analyzer), QueryConfig::default());
        let resolved = resolver
            .resolve("how is it doing", &RequestContext::new("s1"), &store)
            .await;
        assert_eq!(resolved.symbols, vec!["NVDA"]);
    }

    #[test]
    fn test_normalize_symbols() {
        let symbols = vec![" aapl ".to_string(), "$msft".to_string(), "AAPL".to_string(), String::new()];
        assert_eq!(normalize_symbols(symbols), vec!["AAPL", "MSFT"]);
    }
}
