//! DashScope chat-completion client (OpenAI-compatible endpoint)

use serde::{Deserialize, Serialize};

use crate::llm::{ChatMessage, LlmClient, LlmError};

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_MODEL: &str = "qwen-turbo";

#[derive(Debug, Clone)]
pub struct DashScopeConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl DashScopeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

/// Blocking client; one request per call, no retry
#[derive(Debug)]
pub struct DashScopeClient {
    config: DashScopeConfig,
    http: reqwest::blocking::Client,
}

impl DashScopeClient {
    pub fn new(config: DashScopeConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::NotConfigured);
        }
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

impl LlmClient for DashScopeClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages,
        };

        tracing::debug!(
            "Calling {} with {} messages",
            self.config.model,
            messages.len()
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response
            .json()
            .map_err(|e| LlmError::MalformedEnvelope(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedEnvelope("no choices in response".to_string()))
    }
}
