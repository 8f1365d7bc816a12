use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::ai::ChatMessage;
use crate::config::EffectiveConfig;
use crate::error::LlmError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Raw assistant text from a single request. Empty when the endpoint
/// returned no content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub raw: String,
    pub usage: Option<Usage>,
}

/// A network client for a chat-completions endpoint. One attempt per call,
/// no retries.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<Completion, LlmError>;

    /// Zero-token connectivity probe.
    async fn ping(&self) -> Result<(), LlmError>;

    /// Endpoint description for logs and messages. Never includes credentials.
    fn target(&self) -> String;
}

/// Builds a fresh client for a configuration. Called at startup and again
/// whenever a transport-affecting field changes.
pub trait BackendFactory: Send + Sync {
    fn build(&self, config: &EffectiveConfig) -> Result<Box<dyn ChatBackend>>;
}
