//! Remote chat-completions runner.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint. The request
//! asks the model to return only the text following `Return exactly:`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{Runner, RunnerOptions};
use crate::domain::{BenchError, Result, RunnerResult};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const INSTRUCTIONS: &str = "You are a tool that extracts the exact text following 'Return exactly:' \
from the user input. Return ONLY that text with no quotes, punctuation, or explanation. \
If the user input does not contain that phrase, return an empty string.";

/// Connection settings for the chat-completions runner.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("MINIBENCH_OPENAI_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
        }
    }
}

impl OpenAiConfig {
    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `MINIBENCH_OPENAI_MODEL`.
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn new(base_url: &str, model: &str) -> Self {
        OpenAiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
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
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: Option<u64>,
}

fn build_request<'a>(model: &'a str, prompt: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        temperature: 0.0,
        messages: vec![
            ChatMessage {
                role: "system",
                content: INSTRUCTIONS,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ],
    }
}

/// Turn a raw response body into a runner result.
fn parse_completion(raw: Value, fallback_model: &str, latency_ms: u64) -> Result<RunnerResult> {
    let response: ChatResponse = serde_json::from_value(raw.clone())?;
    let output_text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    let mut result = RunnerResult::text(output_text)
        .with_model(response.model.unwrap_or_else(|| fallback_model.to_string()))
        .with_latency_ms(latency_ms);
    if let Some(tokens) = response.usage.and_then(|u| u.total_tokens) {
        result = result.with_tokens(tokens);
    }
    result.raw = Some(raw);
    Ok(result)
}

/// Runner backed by a remote chat model.
pub struct OpenAiChatRunner {
    config: OpenAiConfig,
    http_client: reqwest::Client,
}

impl OpenAiChatRunner {
    /// Build a runner; fails when no API key is configured.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(BenchError::Runner(
                "openai:chat requires OPENAI_API_KEY to be set".to_string(),
            ));
        }
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("minibench/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(OpenAiChatRunner {
            config,
            http_client,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env())
    }
}

#[async_trait]
impl Runner for OpenAiChatRunner {
    fn name(&self) -> &str {
        "openai:chat"
    }

    async fn run(&self, prompt: &str, options: &RunnerOptions) -> Result<RunnerResult> {
        let started = Instant::now();
        let mut request = self
            .http_client
            .post(self.config.endpoint())
            .json(&build_request(&self.config.model, prompt));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        if let Some(ms) = options.timeout_ms {
            request = request.timeout(Duration::from_millis(ms));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BenchError::Runner(format!(
                "openai:chat returned {}: {}",
                status, body
            )));
        }

        let raw: Value = response.json().await?;
        let latency_ms = started.elapsed().as_millis() as u64;
        debug!(model = %self.config.model, latency_ms, "chat completion received");
        parse_completion(raw, &self.config.model, latency_ms)
    }
}
