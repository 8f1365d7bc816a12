// External dependencies
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

// Internal dependencies
use crate::ai::{BackendFactory, ChatBackend, ChatMessage, Completion, Usage};
use crate::config::{defaults, normalize_base_url, EffectiveConfig, Provider, Secret};
use crate::error::{cause_chain, ConfigError, LlmError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ERROR_BODY: usize = 500;

/// Placeholder credential for local endpoints that ignore auth.
const LOCAL_API_KEY: &str = "ollama";

// ============================================================================
// Chat Completions Wire Format
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the OpenAI API or any endpoint speaking the same protocol.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    chat_url: Url,
    models_url: Url,
    token: Secret,
}

// ============================================================================
// Client Implementation
// ============================================================================

impl OpenAiClient {
    /// `base_url` must already carry the API version segment.
    pub fn new(base_url: &str, token: Secret) -> Result<Self, LlmError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let chat_url = endpoint(&base_url, "chat/completions")?;
        let models_url = endpoint(&base_url, "models")?;

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Connectivity {
                target: base_url.clone(),
                cause: cause_chain(&e),
            })?;

        Ok(Self {
            http,
            base_url,
            chat_url,
            models_url,
            token,
        })
    }

    pub fn from_config(config: &EffectiveConfig) -> Result<Self> {
        let (base_url, token) = match config.provider {
            Provider::OpenAi => {
                let key = config.api_key.clone().ok_or(ConfigError::MissingApiKey)?;
                (defaults::OPENAI_BASE_URL.to_string(), key)
            }
            Provider::Compatible => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| normalize_base_url(defaults::BASE_URL));
                let token = config
                    .bearer_token
                    .clone()
                    .unwrap_or_else(|| Secret::new(LOCAL_API_KEY));
                (base_url, token)
            }
        };

        let client = Self::new(&base_url, token)?;
        info!("Built {} client for {}", config.provider, client.base_url);
        Ok(client)
    }

    fn connectivity(&self, target: &Url, err: &reqwest::Error) -> LlmError {
        LlmError::Connectivity {
            target: target.to_string(),
            cause: cause_chain(err),
        }
    }

    async fn check_status(
        &self,
        target: &Url,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        warn!("{target} returned {status}");
        Err(LlmError::Status {
            target: target.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<Completion, LlmError> {
        let request = ChatRequest {
            model,
            messages,
            temperature: 0.0,
        };
        debug!(
            "Sending {} messages to {} (model {model})",
            messages.len(),
            self.chat_url
        );

        let response = self
            .http
            .post(self.chat_url.clone())
            .bearer_auth(self.token.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.connectivity(&self.chat_url, &e))?;
        let response = self.check_status(&self.chat_url, response).await?;

        let parsed: ChatResponse = response.json().await.map_err(|e| LlmError::Decode {
            target: self.chat_url.to_string(),
            cause: cause_chain(&e),
        })?;

        let raw = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default()
            .trim()
            .to_string();

        debug!("Received {} bytes of content", raw.len());
        Ok(Completion {
            raw,
            usage: parsed.usage,
        })
    }

    async fn ping(&self) -> Result<(), LlmError> {
        debug!("Probing {}", self.models_url);

        let response = self
            .http
            .get(self.models_url.clone())
            .bearer_auth(self.token.expose())
            .send()
            .await
            .map_err(|e| self.connectivity(&self.models_url, &e))?;
        self.check_status(&self.models_url, response).await?;
        Ok(())
    }

    fn target(&self) -> String {
        self.base_url.clone()
    }
}

fn endpoint(base_url: &str, path: &str) -> Result<Url, LlmError> {
    let raw = format!("{base_url}/{path}");
    Url::parse(&raw).map_err(|e| LlmError::InvalidUrl {
        url: raw,
        reason: e.to_string(),
    })
}

// ============================================================================
// Factory
// ============================================================================

/// Builds real HTTP clients from the effective configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpBackendFactory;

impl BackendFactory for HttpBackendFactory {
    fn build(&self, config: &EffectiveConfig) -> Result<Box<dyn ChatBackend>> {
        Ok(Box::new(OpenAiClient::from_config(config)?))
    }
}
