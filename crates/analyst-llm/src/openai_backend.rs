//! OpenAI-compatible HTTP backend implementation
//!
//! Works against any endpoint speaking the OpenAI `chat/completions`
//! protocol (OpenAI itself, vLLM, LM Studio, gateway proxies).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
use analyst_utils::error::LlmError;

/// Default chat-completions endpoint
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible backend configuration
#[derive(Clone)]
pub(crate) struct OpenAiBackend {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
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

impl OpenAiBackend {
    /// Create a new OpenAI-compatible backend
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be
    /// constructed
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        default_model: String,
        default_params: ChatParams,
    ) -> Result<Self, LlmError> {
        let client = HttpClient::new()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
            default_params,
        })
    }

    /// Create a new OpenAI-compatible backend from configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if:
    /// - The API key environment variable is not set
    /// - No model is configured
    /// - The HTTP client cannot be constructed
    pub fn new_from_config(config: &analyst_config::Config) -> Result<Self, LlmError> {
        let openai = config.llm.openai.as_ref();

        let api_key_env = openai
            .and_then(|o| o.api_key_env.as_deref())
            .unwrap_or("OPENAI_API_KEY");

        let api_key = std::env::var(api_key_env).map_err(|_| {
            LlmError::Misconfiguration(format!(
                "OpenAI API key not found in environment variable '{api_key_env}'. \
                 Please set this variable or configure a different api_key_env in [llm.openai]."
            ))
        })?;

        let base_url = openai.and_then(|o| o.base_url.clone());

        let default_model = openai.and_then(|o| o.model.clone()).ok_or_else(|| {
            LlmError::Misconfiguration(
                "OpenAI model not specified in configuration. \
                 Please set [llm.openai] model = \"model-name\"."
                    .to_string(),
            )
        })?;

        let default_params = ChatParams {
            max_tokens: openai.and_then(|o| o.max_tokens).unwrap_or(1024),
            temperature: openai.and_then(|o| o.temperature).unwrap_or(0.2),
        };

        Self::new(api_key, base_url, default_model, default_params)
    }

    /// Resolve parameters for this invocation
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

    /// Convert messages to OpenAI chat format
    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| OpenAiMessage {
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
impl LlmBackend for OpenAiBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.resolve_params(&inv);

        debug!(
            provider = "openai",
            model = %model,
            task = %inv.task,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking OpenAI-compatible backend"
        );

        let request_body = ChatCompletionRequest {
            model: model.clone(),
            messages: Self::convert_messages(&inv.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let request = self
            .client
            .inner()
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, "openai")
            .await?;

        let response_body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("Failed to parse OpenAI response: {e}")))?;

        let content = response_body
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(LlmError::Transport(
                "OpenAI response contained no choices".to_string(),
            ));
        }

        let mut result = LlmResult::new(content, "openai", model);
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }

        Ok(result)
    }
}

/// OpenAI chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

/// Chat-completions request body
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

/// Chat-completions response body
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

/// A single completion choice
#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: OpenAiMessage,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_resolve_params_uses_defaults() {
        let backend = OpenAiBackend::new(
            "test-key".to_string(),
            None,
            "gpt-4o-mini".to_string(),
            ChatParams::default(),
        )
        .unwrap();

        let inv = LlmInvocation::new("q1", "answer-synthesis", "", Duration::from_secs(30), vec![]);
        let (model, params) = backend.resolve_params(&inv);

        assert_eq!(model, "gpt-4o-mini");
        assert_eq!(params.max_tokens, 1024);
    }

    #[test]
    fn test_convert_messages_maps_roles() {
        let messages = vec![Message::system("sys"), Message::user("usr")];
        let converted = OpenAiBackend::convert_messages(&messages);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[1].role, "user");
    }

    #[test]
    fn test_new_from_config_missing_api_key() {
        let test_env_var = "OPENAI_API_KEY_TEST_MISSING";
        unsafe {
            std::env::remove_var(test_env_var);
        }

        let mut config = analyst_config::Config::default();
        config.llm.openai = Some(analyst_config::OpenAiConfig {
            api_key_env: Some(test_env_var.to_string()),
            base_url: None,
            model: Some("gpt-4o-mini".to_string()),
            max_tokens: None,
            temperature: None,
        });

        match OpenAiBackend::new_from_config(&config) {
            Err(LlmError::Misconfiguration(msg)) => {
                assert!(msg.contains(test_env_var));
            }
            _ => panic!("Expected Misconfiguration error for missing API key"),
        }
    }

    #[test]
    fn test_new_from_config_missing_model() {
        let test_env_var = "OPENAI_API_KEY_TEST_MODEL";
        unsafe {
            std::env::set_var(test_env_var, "test-key");
        }

        let mut config = analyst_config::Config::default();
        config.llm.openai = Some(analyst_config::OpenAiConfig {
            api_key_env: Some(test_env_var.to_string()),
            base_url: None,
            model: None,
            max_tokens: None,
            temperature: None,
        });

        match OpenAiBackend::new_from_config(&config) {
            Err(LlmError::Misconfiguration(msg)) => {
                assert!(msg.contains("model"));
            }
            _ => panic!("Expected Misconfiguration error for missing model"),
        }

        unsafe {
            std::env::remove_var(test_env_var);
        }
    }
}
