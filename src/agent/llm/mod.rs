//! LLM client abstraction layer.
//!
//! This module provides:
//! - [`LlmClient`] trait for swappable model providers
//! - [`ProviderRegistry`] for provider creation from config
//! - The concrete Gemini implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

pub mod gemini;

pub use gemini::GeminiClient;

use super::message::{Message, ToolCallRequest};

/// Response from an LLM provider: either a final answer (no tool calls)
/// or a request to run one or more tools.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Text content of the response.
    pub content: Option<String>,

    /// Tool calls requested by the model, in emission order.
    pub tool_calls: Vec<ToolCallRequest>,

    /// Reason the response finished.
    pub finish_reason: String,

    /// Token usage statistics.
    pub usage: Usage,
}

impl LlmResponse {
    /// Create a simple text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }

    /// Check if the response requests tool execution.
    #[inline]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// LLM client trait — swappable provider abstraction.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the message history (system prompt first) and get one response.
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LlmResponse>;

    /// Get the model this client talks to.
    fn model(&self) -> &str;
}

/// Provider registry — creates LLM clients from configuration.
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// Create an LLM client from configuration.
    ///
    /// Supported providers:
    /// - `"gemini"`: Gemini API with API key authentication
    pub fn create(config: &Config) -> Result<Arc<dyn LlmClient>> {
        match config.provider.as_str() {
            "gemini" => {
                let client = GeminiClient::new(&config.gemini_api_key, &config.model);
                Ok(Arc::new(client))
            }
            other => Err(Error::Config(format!("Unknown provider: {other}"))),
        }
    }

    /// List available provider names.
    pub fn available() -> &'static [&'static str] {
        &["gemini"]
    }
}

/// Fake LLM client for testing.
#[cfg(test)]
pub struct FakeLlmClient {
    responses: std::sync::Mutex<std::collections::VecDeque<LlmResponse>>,
    /// Number of chat calls made, for asserting round counts.
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl FakeLlmClient {
    /// Create with predefined text responses.
    pub fn new(responses: Vec<&str>) -> Self {
        Self::from_responses(responses.iter().map(|s| LlmResponse::text(*s)).collect())
    }

    /// Create from raw responses (tool calls included).
    pub fn from_responses(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A response requesting the given tool calls.
    pub fn tool_call_response(calls: Vec<(&str, &str, serde_json::Value)>) -> LlmResponse {
        LlmResponse {
            content: None,
            tool_calls: calls
                .into_iter()
                .map(|(id, name, arguments)| ToolCallRequest {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments,
                })
                .collect(),
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(&self, _messages: &[Message], _tools: &[ToolDefinition]) -> Result<LlmResponse> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        responses
            .pop_front()
            .ok_or_else(|| Error::Llm("No more fake responses".to_string()))
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_llm_client() {
        let client = FakeLlmClient::new(vec!["Merhaba!", "Görüşürüz!"]);

        let resp1 = client.chat(&[], &[]).await.unwrap();
        assert_eq!(resp1.content.as_deref(), Some("Merhaba!"));

        let resp2 = client.chat(&[], &[]).await.unwrap();
        assert_eq!(resp2.content.as_deref(), Some("Görüşürüz!"));
        assert_eq!(client.call_count(), 2);
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let config = Config {
            provider: "openai".to_string(),
            ..Config::default()
        };
        assert!(ProviderRegistry::create(&config).is_err());
    }
}
