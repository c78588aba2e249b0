//! OpenAI-compatible analyzer
//!
//! Sends the query, recent history and a summary of the conversation state to
//! a `/chat/completions` endpoint and parses the JSON verdict it answers with.
//! Works with any OpenAI-compatible server (OpenAI, vLLM, LM Studio, Ollama).

use std::time::Duration;

use async_trait::async_trait;
use minijinja::{Environment, context};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{AnalysisRequest, AnalyzerVerdict, QueryAnalyzer};
use crate::error::{AnalyzerError, QueryError, Result};
use crate::intent::Intent;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_HISTORY: usize = 6;

const SYSTEM_TEMPLATE: &str = r#"You classify messages sent to a financial assistant.

Answer with a single JSON object and nothing else:
{"isFinancial": bool, "intent": string, "symbols": [string], "requiresChart": bool, "confidence": number}

Valid intents: {{ intents | join(", ") }}.

Rules:
- symbols are upper-case tickers (BTC for bitcoin, GC for gold, SI for silver, CL for oil, SPY for the S&P 500).
- Never turn ordinary words such as "chart", "price", "trend", "who" or "it" into symbols.
- requiresChart is true only when the user asks to see a chart or graph.
- If the message refers back to something ("it", "the trend", "that stock") use the conversation state to fill in the symbol.
{% if active_symbol %}
Conversation state:
- active symbol: {{ active_symbol }}
{%- if discussed %}
- discussed symbols: {{ discussed | join(", ") }}
{%- endif %}
{%- if last_intent %}
- last intent: {{ last_intent }}
{%- endif %}
{% endif %}"#;

/// Configuration for the LLM analyzer
#[derive(Debug, Clone)]
pub struct LlmAnalyzerConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL of the OpenAI-compatible API
    pub api_base: String,

    /// Model name
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Number of history turns included in the request
    pub max_history: usize,
}

impl LlmAnalyzerConfig {
    /// Create a config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    /// Create config from environment variables
    ///
    /// Reads `OPENAI_API_KEY` (required), `OPENAI_API_BASE` and `OPENAI_MODEL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            QueryError::ConfigError("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let mut config = Self::new(api_key);
        if let Ok(api_base) = std::env::var("OPENAI_API_BASE") {
            config.api_base = api_base;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.model = model;
        }
        Ok(config)
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set how many history turns are sent
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Analyzer backed by an OpenAI-compatible chat endpoint
pub struct LlmQueryAnalyzer {
    client: Client,
    config: LlmAnalyzerConfig,
    templates: Environment<'static>,
}

impl LlmQueryAnalyzer {
    /// Create an analyzer with the given configuration
    pub fn with_config(config: LlmAnalyzerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QueryError::ConfigError(format!("HTTP client: {e}")))?;

        let mut templates = Environment::new();
        templates.add_template("system", SYSTEM_TEMPLATE)?;

        Ok(Self {
            client,
            config,
            templates,
        })
    }

    /// Create an analyzer from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(LlmAnalyzerConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &LlmAnalyzerConfig {
        &self.config
    }

    fn system_prompt(&self, request: &AnalysisRequest) -> std::result::Result<String, AnalyzerError> {
        let intents: Vec<&str> = Intent::ALL.iter().map(Intent::as_str).collect();
        let state = request.state.as_ref();

        let mut discussed: Vec<&str> = state
            .map(|s| s.discussed_symbols.keys().map(String::as_str).collect())
            .unwrap_or_default();
        discussed.sort_unstable();

        let template = self.templates.get_template("system")?;
        let prompt = template.render(context! {
            intents => intents,
            active_symbol => state.and_then(|s| s.active_symbol.clone()),
            discussed => discussed,
            last_intent => state.and_then(|s| s.last_intent).map(|i| i.as_str()),
        })?;
        Ok(prompt)
    }

    fn build_messages(
        &self,
        request: &AnalysisRequest,
    ) -> std::result::Result<Vec<ChatMessage>, AnalyzerError> {
        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: self.system_prompt(request)?,
        }];

        let skip = request.history.len().saturating_sub(self.config.max_history);
        messages.extend(request.history.iter().skip(skip).map(|turn| ChatMessage {
            role: turn.role.clone(),
            content: turn.content.clone(),
        }));

        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.query.clone(),
        });
        Ok(messages)
    }
}

#[async_trait]
impl QueryAnalyzer for LlmQueryAnalyzer {
    #[instrument(skip(self, request), fields(model = %self.config.model, api_base = %self.config.api_base))]
    async fn analyze_query(
        &self,
        request: &AnalysisRequest,
    ) -> std::result::Result<AnalyzerVerdict, AnalyzerError> {
        debug!("Sending analysis request to {}", self.config.api_base);

        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: self.build_messages(request)?,
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await?;

            return Err(AnalyzerError::Http {
                status,
                message: match status {
                    401 => "authentication failed".to_string(),
                    429 => format!("rate limit exceeded: {error_text}"),
                    _ => error_text,
                },
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            AnalyzerError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AnalyzerError::UnexpectedResponse("No content in response".to_string()))?;

        let verdict = parse_verdict(&content)?;
        debug!(intent = %verdict.intent, symbols = ?verdict.symbols, "Analyzer verdict");
        Ok(verdict)
    }
}

/// Parse a verdict out of model output
///
/// Tolerates Markdown code fences and prose around the JSON object.
pub fn parse_verdict(content: &str) -> std::result::Result<AnalyzerVerdict, AnalyzerError> {
    let body = strip_code_fence(content);

    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(AnalyzerError::UnexpectedResponse(format!(
                "no JSON object in analyzer output: {body}"
            )));
        }
    };

    Ok(serde_json::from_str(json)?)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json") on the opening fence line
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HistoryTurn;
    use crate::state::{ConversationState, StatePatch};

    fn request(query: &str) -> AnalysisRequest {
        AnalysisRequest {
            query: query.to_string(),
            history: Vec::new(),
            state: None,
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let verdict = parse_verdict(
            r#"{"isFinancial": true, "intent": "comparison", "symbols": ["GC", "SI"], "requiresChart": false, "confidence": 0.9}"#,
        )
        .unwrap();
        assert_eq!(verdict.intent, Intent::Comparison);
        assert_eq!(verdict.symbols, vec!["GC", "SI"]);
    }

    #[test]
    fn test_parse_fenced_json() {
        let content = "```json\n{\"is_financial\": true, \"intent\": \"trend_analysis\", \"symbols\": [\"BTC\"], \"requires_chart\": true}\n```";
        let verdict = parse_verdict(content).unwrap();
        assert_eq!(verdict.intent, Intent::TrendAnalysis);
        assert!(verdict.requires_chart);
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let content = "Sure! Here you go: {\"intent\": \"greeting\", \"isFinancial\": false} Hope that helps.";
        let verdict = parse_verdict(content).unwrap();
        assert_eq!(verdict.intent, Intent::Greeting);
        assert!(!verdict.is_financial);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_verdict("I cannot help with that"),
            Err(AnalyzerError::UnexpectedResponse(_))
        ));
        assert!(matches!(
            parse_verdict("{not json}"),
            Err(AnalyzerError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_config_builder() {
        let config = LlmAnalyzerConfig::new("key")
            .with_api_base("http://localhost:1234/v1")
            .with_model("local-model")
            .with_timeout(5)
            .with_max_history(2);

        assert_eq!(config.api_base, "http://localhost:1234/v1");
        assert_eq!(config.model, "local-model");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_history, 2);
    }

    #[test]
    fn test_system_prompt_includes_state() {
        let analyzer = LlmQueryAnalyzer::with_config(LlmAnalyzerConfig::new("key")).unwrap();

        let prompt = analyzer.system_prompt(&request("trend?")).unwrap();
        assert!(prompt.contains("trend_analysis"));
        assert!(!prompt.contains("active symbol"));

        let mut state = ConversationState::new("s1");
        state.apply(StatePatch {
            active_symbol: Some("NVDA".to_string()),
            last_intent: Some(Intent::StandardAnalysis),
            ..Default::default()
        });
        let mut with_state = request("trend?");
        with_state.state = Some(state);

        let prompt = analyzer.system_prompt(&with_state).unwrap();
        assert!(prompt.contains("active symbol: NVDA"));
        assert!(prompt.contains("last intent: standard_analysis"));
    }

    #[test]
    fn test_history_is_truncated() {
        let analyzer =
            LlmQueryAnalyzer::with_config(LlmAnalyzerConfig::new("key").with_max_history(2))
                .unwrap();

        let mut req = request("and now?");
        req.history = vec![
            HistoryTurn::user("one"),
            HistoryTurn::assistant("two"),
            HistoryTurn::user("three"),
        ];

        let messages = analyzer.build_messages(&req).unwrap();
        let contents: Vec<_> = messages.iter().skip(1).map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three", "and now?"]);
        assert_eq!(messages[0].role, "system");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let analyzer = LlmQueryAnalyzer::with_config(
            LlmAnalyzerConfig::new("key")
                .with_api_base("http://127.0.0.1:9")
                .with_timeout(2),
        )
        .unwrap();

        let result = analyzer.analyze_query(&request("AAPL")).await;
        assert!(matches!(result, Err(AnalyzerError::Request(_))));
    }
}
