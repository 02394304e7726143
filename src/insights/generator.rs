use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::prompt::{
    build_insight_prompt, build_weekly_prompt, InsightRequest, INSIGHT_SYSTEM_PROMPT,
    WEEKLY_SYSTEM_PROMPT,
};
use crate::journal::models::JournalEntry;

/// Summary returned when there is nothing to summarize
pub const EMPTY_WEEK_SUMMARY: &str = "No mood entries this week to analyze.";

const CONNECTION_TEST_PROMPT: &str = "Say 'Hello' if you can hear me.";
const CONNECTION_TEST_MAX_TOKENS: u32 = 10;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("AI service not configured: {0}")]
    NotConfigured(String),
    #[error("Rate limit exceeded. Please try again later. {0}")]
    RateLimited(String),
    #[error("Error generating insight: {0}")]
    Generation(String),
}

/// Outcome of a connectivity probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionCheck {
    pub available: bool,
    pub message: String,
}

impl ConnectionCheck {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            available: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            available: false,
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait InsightGenerator: Send + Sync {
    /// Whether the generator is configured to serve requests at all
    fn is_available(&self) -> bool;

    async fn generate_insight(&self, request: &InsightRequest) -> Result<String, GeneratorError>;

    /// Summarize entries in the order given. An empty slice yields
    /// [`EMPTY_WEEK_SUMMARY`] without calling out.
    async fn generate_weekly_summary(
        &self,
        entries: &[JournalEntry],
    ) -> Result<String, GeneratorError>;

    async fn test_connection(&self) -> ConnectionCheck;
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Missing key leaves the generator unavailable
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible chat completions API
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub insight_max_tokens: u32,
    pub summary_max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            insight_max_tokens: 200,
            summary_max_tokens: 300,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Generator backed by an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    config: GeneratorConfig,
    client: Client,
    endpoint: Url,
}

impl OpenAiGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let endpoint = Self::chat_endpoint(&config.base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GeneratorError::NotConfigured(format!("HTTP client: {e}")))?;

        if config.api_key.is_none() {
            warn!("No AI API key configured; insight generation is disabled");
        } else {
            info!(model = %config.model, "AI insight generator initialized");
        }

        Ok(Self {
            config,
            client,
            endpoint,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn chat_endpoint(base_url: &str) -> Result<Url, GeneratorError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| GeneratorError::NotConfigured(format!("invalid base URL: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(GeneratorError::NotConfigured(format!(
                "unsupported URL scheme: {}",
                base.scheme()
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join("chat/completions")
            .map_err(|e| GeneratorError::NotConfigured(format!("invalid base URL: {e}")))
    }

    fn api_key(&self) -> Result<&str, GeneratorError> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GeneratorError::NotConfigured("API key not configured".to_string()))
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, GeneratorError> {
        let api_key = self.api_key()?;

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Generation("request timed out".to_string())
                } else {
                    GeneratorError::Generation(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));

            return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(%status, "AI service rate limited the request");
                GeneratorError::RateLimited(detail)
            } else {
                error!(%status, detail = %detail, "AI service returned an error");
                GeneratorError::Generation(detail)
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Generation(format!("malformed response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(GeneratorError::Generation(
                "empty response from AI service".to_string(),
            ));
        }

        Ok(content)
    }
}

#[async_trait]
impl InsightGenerator for OpenAiGenerator {
    fn is_available(&self) -> bool {
        self.api_key().is_ok()
    }

    #[instrument(skip(self, request), fields(emotion = %request.emotion))]
    async fn generate_insight(&self, request: &InsightRequest) -> Result<String, GeneratorError> {
        let prompt = build_insight_prompt(request);
        debug!(prompt_len = prompt.len(), "Requesting insight");

        let insight = self
            .complete(INSIGHT_SYSTEM_PROMPT, &prompt, self.config.insight_max_tokens)
            .await?;
        info!(insight_len = insight.len(), "Generated insight");
        Ok(insight)
    }

    #[instrument(skip(self, entries), fields(entry_count = entries.len()))]
    async fn generate_weekly_summary(
        &self,
        entries: &[JournalEntry],
    ) -> Result<String, GeneratorError> {
        if entries.is_empty() {
            return Ok(EMPTY_WEEK_SUMMARY.to_string());
        }

        let prompt = build_weekly_prompt(entries);
        self.complete(WEEKLY_SYSTEM_PROMPT, &prompt, self.config.summary_max_tokens)
            .await
    }

    async fn test_connection(&self) -> ConnectionCheck {
        if !self.is_available() {
            return ConnectionCheck::failed("API key not configured");
        }

        match self
            .complete(
                INSIGHT_SYSTEM_PROMPT,
                CONNECTION_TEST_PROMPT,
                CONNECTION_TEST_MAX_TOKENS,
            )
            .await
        {
            Ok(_) => ConnectionCheck::ok("Connection successful"),
            Err(e) => ConnectionCheck::failed(format!("Connection failed: {e}")),
        }
    }
}
