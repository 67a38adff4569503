//! Chat-completion seam to the hosted language model
//!
//! Calls are blocking from the caller's point of view; workers run them on
//! their own thread. There is no retry and no cancellation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One `{role, content}` entry of a chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM client is not configured (missing API key)")]
    NotConfigured,

    #[error("LLM request failed: {0}")]
    Transport(String),

    #[error("LLM service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed LLM response envelope: {0}")]
    MalformedEnvelope(String),
}

/// Sends an ordered message list, returns the single text reply
pub trait LlmClient: Send + Sync {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

/// Stand-in used when no backend is configured; every call fails, so every
/// caller falls back to its neutral result
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredClient;

impl LlmClient for UnconfiguredClient {
    fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_string(&ChatMessage::system("规则")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"规则"}"#);
    }

    #[test]
    fn test_unconfigured_client_fails() {
        let result = UnconfiguredClient.complete(&[ChatMessage::user("你好")]);
        assert!(matches!(result, Err(LlmError::NotConfigured)));
    }
}
