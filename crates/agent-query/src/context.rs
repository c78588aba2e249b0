//! Inbound request context

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One prior message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl HistoryTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A single portfolio position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
    /// Total amount paid for the position
    #[serde(default, alias = "costBasis")]
    pub cost_basis: Option<f64>,
}

/// The user's portfolio as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
}

impl Portfolio {
    /// Symbols held, in portfolio order
    pub fn symbols(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.symbol.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

/// Everything the caller knows about a request besides its text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub session_id: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryTurn>,
    #[serde(default)]
    pub portfolio: Option<Portfolio>,
    /// Precomputed metrics passed through to the portfolio handler
    #[serde(default)]
    pub portfolio_metrics: Option<Value>,
    /// Caller-supplied topic hint; possibly stale from an earlier turn
    #[serde(default)]
    pub topic: Option<String>,
}

impl RequestContext {
    /// Context for a session with no history
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_portfolio(mut self, portfolio: Portfolio) -> Self {
        self.portfolio = Some(portfolio);
        self
    }

    pub fn with_portfolio_metrics(mut self, metrics: Value) -> Self {
        self.portfolio_metrics = Some(metrics);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_from_camel_case_json() {
        let context: RequestContext = serde_json::from_value(json!({
            "sessionId": "abc",
            "conversationHistory": [{"role": "user", "content": "NVDA price"}],
            "portfolio": {"holdings": [{"symbol": "AAPL", "quantity": 10, "costBasis": 1500.0}]},
            "topic": "TSLA"
        }))
        .unwrap();

        assert_eq!(context.session_id, "abc");
        assert_eq!(context.conversation_history, vec![HistoryTurn::user("NVDA price")]);
        assert_eq!(context.portfolio.unwrap().symbols(), vec!["AAPL"]);
        assert_eq!(context.topic.as_deref(), Some("TSLA"));
        assert!(context.portfolio_metrics.is_none());
    }
}
