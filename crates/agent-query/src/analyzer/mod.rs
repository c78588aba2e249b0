//! The query analyzer collaborator
//!
//! The resolver asks an analyzer (normally a language model) first and falls
//! back to local rules whenever the call returns an [`AnalyzerError`].

pub mod llm;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::context::HistoryTurn;
use crate::error::AnalyzerError;
use crate::intent::Intent;
use crate::state::ConversationState;

pub use llm::{LlmAnalyzerConfig, LlmQueryAnalyzer};

/// Input handed to an analyzer
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Raw query text
    pub query: String,
    /// Recent conversation, oldest first
    pub history: Vec<HistoryTurn>,
    /// Snapshot of the session's conversation state
    pub state: Option<ConversationState>,
}

/// What an analyzer concluded about a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerVerdict {
    #[serde(alias = "isFinancial", default = "default_true")]
    pub is_financial: bool,
    #[serde(deserialize_with = "lenient_intent", default = "default_intent")]
    pub intent: Intent,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(alias = "requiresChart", default)]
    pub requires_chart: bool,
    #[serde(default)]
    pub confidence: Option<f64>,
}

fn default_true() -> bool {
    true
}

fn default_intent() -> Intent {
    Intent::StandardAnalysis
}

/// Unknown or missing labels fall back to standard analysis
fn lenient_intent<'de, D>(deserializer: D) -> Result<Intent, D::Error>
where
    D: Deserializer<'de>,
{
    let label = Option::<String>::deserialize(deserializer)?;
    Ok(label
        .as_deref()
        .and_then(Intent::from_label)
        .unwrap_or_else(default_intent))
}

/// Classifies a query into intent and symbols
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryAnalyzer: Send + Sync {
    /// Analyze a query in the context of its conversation
    async fn analyze_query(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalyzerVerdict, AnalyzerError>;
}

/// Analyzer used when no language model is configured
///
/// Always fails, so every query takes the deterministic path.
#[derive(Debug, Clone, Default)]
pub struct UnavailableAnalyzer;

#[async_trait]
impl QueryAnalyzer for UnavailableAnalyzer {
    async fn analyze_query(
        &self,
        _request: &AnalysisRequest,
    ) -> Result<AnalyzerVerdict, AnalyzerError> {
        Err(AnalyzerError::Unavailable(
            "no language model configured".to_string(),
        ))
    }
}
