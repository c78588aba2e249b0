//! Per-session conversation state
//!
//! The store is an explicit handle owned by the request-handling layer, not a
//! global. Reads hand out snapshots; every mutation goes through
//! [`ConversationStore::update`], which applies a [`StatePatch`] computed from
//! the current state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::intent::Intent;

/// What the session knows about one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDiscussion {
    /// Price reported the last time the symbol was discussed
    pub last_price: Option<f64>,
    /// Intent of the response that discussed it
    pub analysis_kind: Intent,
    /// Whether a chart was produced for it in this session
    pub chart_shown: bool,
    /// When it was last discussed
    pub last_discussed_at: DateTime<Utc>,
}

/// Lifecycle of a symbol within a session
///
/// Moves forward only: unseen, discussed, discussed with a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SymbolStage {
    Unseen,
    Discussed,
    ChartShown,
}

/// Conversation state for a single session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: String,
    pub discussed_symbols: HashMap<String, SymbolDiscussion>,
    /// Symbol an anaphoric follow-up resolves to
    pub active_symbol: Option<String>,
    pub last_discussed_symbol: Option<String>,
    pub last_intent: Option<Intent>,
    /// Raw text of the last query
    pub last_discussed_topic: Option<String>,
    pub promises_made: IndexSet<String>,
    pub shown_charts: IndexSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// Create an empty state for a session
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            discussed_symbols: HashMap::new(),
            active_symbol: None,
            last_discussed_symbol: None,
            last_intent: None,
            last_discussed_topic: None,
            promises_made: IndexSet::new(),
            shown_charts: IndexSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Where `symbol` sits in its per-session lifecycle
    pub fn stage(&self, symbol: &str) -> SymbolStage {
        match self.discussed_symbols.get(symbol) {
            None => SymbolStage::Unseen,
            Some(entry) if entry.chart_shown || self.shown_charts.contains(symbol) => {
                SymbolStage::ChartShown
            }
            Some(_) => SymbolStage::Discussed,
        }
    }

    /// Whether a chart for `symbol` was already rendered
    pub fn chart_shown(&self, symbol: &str) -> bool {
        self.shown_charts.contains(symbol)
    }

    /// Apply a patch in place
    ///
    /// Discussion entries are overwritten, never removed, and the chart flag
    /// of an existing entry is never cleared. `None` fields leave the current
    /// value untouched.
    pub fn apply(&mut self, patch: StatePatch) {
        for (symbol, mut discussion) in patch.discussions {
            if let Some(previous) = self.discussed_symbols.get(&symbol) {
                discussion.chart_shown |= previous.chart_shown;
                if discussion.last_price.is_none() {
                    discussion.last_price = previous.last_price;
                }
            }
            if self.shown_charts.contains(&symbol) {
                discussion.chart_shown = true;
            }
            self.discussed_symbols.insert(symbol, discussion);
        }

        for symbol in patch.charts_shown {
            if let Some(entry) = self.discussed_symbols.get_mut(&symbol) {
                entry.chart_shown = true;
            }
            self.shown_charts.insert(symbol);
        }

        self.promises_made.extend(patch.promises);

        if let Some(symbol) = patch.active_symbol {
            self.last_discussed_symbol = Some(symbol.clone());
            self.active_symbol = Some(symbol);
        }
        if let Some(intent) = patch.last_intent {
            self.last_intent = Some(intent);
        }
        if let Some(topic) = patch.last_discussed_topic {
            self.last_discussed_topic = Some(topic);
        }

        self.updated_at = Utc::now();
    }
}

/// Partial update to a [`ConversationState`]
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    /// New active (and last discussed) symbol
    pub active_symbol: Option<String>,
    pub last_intent: Option<Intent>,
    pub last_discussed_topic: Option<String>,
    /// Discussion entries to upsert
    pub discussions: Vec<(String, SymbolDiscussion)>,
    /// Symbols whose chart was produced
    pub charts_shown: Vec<String>,
    pub promises: Vec<String>,
}

impl StatePatch {
    /// Whether applying the patch would change anything besides the timestamp
    pub fn is_empty(&self) -> bool {
        self.active_symbol.is_none()
            && self.last_intent.is_none()
            && self.last_discussed_topic.is_none()
            && self.discussions.is_empty()
            && self.charts_shown.is_empty()
            && self.promises.is_empty()
    }
}

/// In-memory conversation store keyed by session id
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    sessions: Arc<RwLock<HashMap<String, ConversationState>>>,
}

impl ConversationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a session's state, creating it on first contact
    pub fn get_or_create(&self, session_id: &str) -> ConversationState {
        if let Some(state) = self.get(session_id) {
            return state;
        }

        let state = ConversationState::new(session_id);
        match self.sessions.write() {
            Ok(mut sessions) => sessions
                .entry(session_id.to_string())
                .or_insert(state)
                .clone(),
            Err(e) => {
                tracing::warn!(session_id, "Conversation store lock poisoned: {}", e);
                state
            }
        }
    }

    /// Snapshot of a session's state, or `None` when it does not exist
    pub fn get(&self, session_id: &str) -> Option<ConversationState> {
        let sessions = match self.sessions.read() {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!(session_id, "Conversation store lock poisoned: {}", e);
                return None;
            }
        };

        let state = sessions.get(session_id).cloned();
        if state.is_none() {
            tracing::debug!(session_id, "Session not found");
        }
        state
    }

    /// Apply a patch computed from the session's current state
    ///
    /// Returns `false` without calling `patch_fn` when the session does not
    /// exist.
    pub fn update<F>(&self, session_id: &str, patch_fn: F) -> bool
    where
        F: FnOnce(&ConversationState) -> StatePatch,
    {
        let mut sessions = match self.sessions.write() {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!(session_id, "Conversation store lock poisoned: {}", e);
                return false;
            }
        };

        let Some(state) = sessions.get_mut(session_id) else {
            tracing::debug!(session_id, "Update ignored for unknown session");
            return false;
        };

        let patch = patch_fn(state);
        state.apply(patch);
        true
    }

    /// Drop a session's state; returns whether it existed
    pub fn clear(&self, session_id: &str) -> bool {
        self.sessions
            .write()
            .ok()
            .and_then(|mut sessions| sessions.remove(session_id))
            .is_some()
    }

    /// Number of tracked sessions
    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether no session is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discussion(intent: Intent, price: Option<f64>) -> SymbolDiscussion {
        SymbolDiscussion {
            last_price: price,
            analysis_kind: intent,
            chart_shown: false,
            last_discussed_at: Utc::now(),
        }
    }

    #[test]
    fn test_get_missing_session() {
        let store = ConversationStore::new();
        assert!(store.get("nope").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let store = ConversationStore::new();
        let first = store.get_or_create("s1");
        let second = store.get_or_create("s1");
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_missing_session_is_noop() {
        let store = ConversationStore::new();
        let mut called = false;
        let applied = store.update("ghost", |_| {
            called = true;
            StatePatch::default()
        });
        assert!(!applied);
        assert!(!called);
        assert!(store.get("ghost").is_none());
    }

    #[test]
    fn test_update_sets_active_and_last_symbol() {
        let store = ConversationStore::new();
        store.get_or_create("s1");

        store.update("s1", |_| StatePatch {
            active_symbol: Some("NVDA".to_string()),
            last_intent: Some(Intent::StandardAnalysis),
            discussions: vec![(
                "NVDA".to_string(),
                discussion(Intent::StandardAnalysis, Some(120.0)),
            )],
            ..Default::default()
        });

        let state = store.get("s1").unwrap();
        assert_eq!(state.active_symbol.as_deref(), Some("NVDA"));
        assert_eq!(state.last_discussed_symbol.as_deref(), Some("NVDA"));
        assert_eq!(state.stage("NVDA"), SymbolStage::Discussed);
        assert_eq!(state.stage("AAPL"), SymbolStage::Unseen);
    }

    #[test]
    fn test_patch_without_symbol_keeps_active_symbol() {
        let store = ConversationStore::new();
        store.get_or_create("s1");
        store.update("s1", |_| StatePatch {
            active_symbol: Some("NVDA".to_string()),
            ..Default::default()
        });
        store.update("s1", |_| StatePatch {
            last_intent: Some(Intent::Greeting),
            ..Default::default()
        });

        let state = store.get("s1").unwrap();
        assert_eq!(state.active_symbol.as_deref(), Some("NVDA"));
        assert_eq!(state.last_intent, Some(Intent::Greeting));
    }

    #[test]
    fn test_chart_stage_never_reverts() {
        let mut state = ConversationState::new("s1");
        state.apply(StatePatch {
            discussions: vec![("BTC".to_string(), discussion(Intent::TrendAnalysis, None))],
            charts_shown: vec!["BTC".to_string()],
            ..Default::default()
        });
        assert_eq!(state.stage("BTC"), SymbolStage::ChartShown);

        state.apply(StatePatch {
            discussions: vec![(
                "BTC".to_string(),
                discussion(Intent::StandardAnalysis, Some(60_000.0)),
            )],
            ..Default::default()
        });
        assert_eq!(state.stage("BTC"), SymbolStage::ChartShown);
        assert_eq!(state.discussed_symbols["BTC"].last_price, Some(60_000.0));
        assert_eq!(
            state.discussed_symbols["BTC"].analysis_kind,
            Intent::StandardAnalysis
        );
    }

    #[test]
    fn test_promises_are_ordered_and_deduplicated() {
        let mut state = ConversationState::new("s1");
        state.apply(StatePatch {
            promises: vec!["chart:BTC".to_string(), "chart:ETH".to_string()],
            ..Default::default()
        });
        state.apply(StatePatch {
            promises: vec!["chart:BTC".to_string()],
            ..Default::default()
        });
        let promises: Vec<_> = state.promises_made.iter().cloned().collect();
        assert_eq!(promises, vec!["chart:BTC", "chart:ETH"]);
    }

    #[test]
    fn test_clear_and_sessions_are_isolated() {
        let store = ConversationStore::new();
        store.get_or_create("a");
        store.get_or_create("b");
        store.update("a", |_| StatePatch {
            active_symbol: Some("AAPL".to_string()),
            ..Default::default()
        });

        assert!(store.get("b").unwrap().active_symbol.is_none());
        assert!(store.clear("a"));
        assert!(!store.clear("a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_patch() {
        assert!(StatePatch::default().is_empty());
    }
}
