//! Ollama HTTP backend implementation
//!
//! Talks to a local Ollama server via its native `/api/chat` endpoint.
//! This is the default provider: the system was built to run against small
//! local models without any API key.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
use analyst_utils::error::LlmError;

/// Default Ollama server address
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model when none is configured
const DEFAULT_MODEL: &str = "phi3.5:3.8b-mini-instruct-q4_K_M";

/// Ollama backend configuration
#[derive(Clone)]
pub(crate) struct OllamaBackend {
    client: Arc<HttpClient>,
    base_url: String,
    default_model: String,
    default_params: ChatParams,
}

/// Request sampling parameters
#[derive(Debug, Clone)]
pub(crate) struct ChatParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.2,
        }
    }
}

impl OllamaBackend {
    /// Create a new Ollama backend
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be
    /// constructed
    pub fn new(
        base_url: Option<String>,
        default_model: Option<String>,
        default_params: ChatParams,
    ) -> Result<Self, LlmError> {
        let client = HttpClient::new()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            default_params,
        })
    }

    /// Create a new Ollama backend from configuration
    ///
    /// Ollama needs no API key; every setting has a workable default so this
    /// succeeds even with an empty `[llm.ollama]` section.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be
    /// constructed
    pub fn new_from_config(config: &analyst_config::Config) -> Result<Self, LlmError> {
        let ollama = config.llm.ollama.as_ref();

        let base_url = ollama.and_then(|o| o.base_url.clone());
        let default_model = ollama.and_then(|o| o.model.clone());
        let default_params = ChatParams {
            max_tokens: ollama.and_then(|o| o.max_tokens).unwrap_or(1024),
            temperature: ollama.and_then(|o| o.temperature).unwrap_or(0.2),
        };

        Self::new(base_url, default_model, default_params)
    }

    /// Resolve parameters for this invocation
    ///
    /// `inv.model` overrides the default model; `inv.metadata` entries
    /// `max_tokens` and `temperature` override the backend defaults.
    fn resolve_params(&self, inv: &LlmInvocation) -> (String, ChatParams) {
        let model = if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        };

        let max_tokens = inv
            .metadata
            .get("max_tokens")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
            .unwrap_or(self.default_params.max_tokens);

        let temperature = inv
            .metadata
            .get("temperature")
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
            .unwrap_or(self.default_params.temperature);

        (
            model,
            ChatParams {
                max_tokens,
                temperature,
            },
        )
    }

    /// Convert messages to Ollama chat format
    fn convert_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|msg| OllamaMessage {
                role: match msg.role {
                    Role::System => "system".to_string(),
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: msg.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.resolve_params(&inv);

        debug!(
            provider = "ollama",
            model = %model,
            task = %inv.task,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Ollama backend"
        );

        let request_body = OllamaChatRequest {
            model: model.clone(),
            messages: Self::convert_messages(&inv.messages),
            stream: false,
            options: OllamaOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        };

        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let request = self
            .client
            .inner()
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, "ollama")
            .await?;

        let response_body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("Failed to parse Ollama response: {e}")))?;

        let content = response_body.message.content;
        if content.is_empty() {
            return Err(LlmError::Transport(
                "Ollama response missing message content".to_string(),
            ));
        }

        let mut result = LlmResult::new(content, "ollama", model);
        if let (Some(input), Some(output)) =
            (response_body.prompt_eval_count, response_body.eval_count)
        {
            result = result.with_tokens(input, output);
        }

        debug!(
            provider = "ollama",
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Ollama invocation completed"
        );

        Ok(result)
    }
}

/// Ollama chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

/// Ollama chat request body
#[derive(Debug, Clone, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

/// Ollama generation options
#[derive(Debug, Clone, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama chat response body
#[derive(Debug, Clone, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}
