//! LLM backend abstraction for multi-provider support
//!
//! This crate is the Inference Service boundary: a task identifier plus a
//! conversation goes in, raw completion text comes out. All providers
//! implement the `LlmBackend` trait, allowing the orchestration engine to
//! work with any provider without knowing implementation details.

pub(crate) mod http_client;
mod ollama_backend;
mod openai_backend;
mod types;

pub use analyst_utils::error::LlmError;
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

pub(crate) use ollama_backend::OllamaBackend;
pub(crate) use openai_backend::OpenAiBackend;

use analyst_config::Config;
use tracing::warn;

/// Metadata recorded when the primary provider fell back to another.
#[derive(Debug, Clone)]
pub struct LlmFallbackInfo {
    pub primary_provider: String,
    pub fallback_provider: String,
    pub reason: String,
}

/// Construct a backend for a specific provider.
///
/// Does not handle fallback logic — that's done by
/// [`from_config_with_fallback`].
///
/// # Errors
///
/// Returns `LlmError::Unsupported` if the provider is unknown, or
/// `LlmError::Misconfiguration` if provider-specific configuration is
/// invalid.
fn construct_backend_for_provider(
    provider: &str,
    config: &Config,
) -> Result<Box<dyn LlmBackend>, LlmError> {
    match provider {
        "ollama" => {
            let backend = OllamaBackend::new_from_config(config)?;
            Ok(Box::new(backend))
        }
        "openai" => {
            let backend = OpenAiBackend::new_from_config(config)?;
            Ok(Box::new(backend))
        }
        unknown => Err(LlmError::Unsupported(format!(
            "Unknown LLM provider '{unknown}'. Supported providers: ollama, openai."
        ))),
    }
}

/// Create an LLM backend from configuration.
///
/// Defaults to `ollama` when no provider is specified.
///
/// # Errors
///
/// Returns `LlmError::Unsupported` for an unknown provider, or
/// `LlmError::Misconfiguration` for invalid provider settings.
pub fn from_config(config: &Config) -> Result<Box<dyn LlmBackend>, LlmError> {
    let (backend, _) = from_config_with_fallback(config)?;
    Ok(backend)
}

/// Create an LLM backend from configuration, returning fallback metadata
/// when the fallback provider was used.
///
/// If the primary provider fails to construct and `fallback_provider` is
/// configured, the fallback backend is returned along with an
/// [`LlmFallbackInfo`] describing why.
///
/// # Errors
///
/// Returns the primary provider's error when no fallback is configured or
/// the fallback also fails to construct.
pub fn from_config_with_fallback(
    config: &Config,
) -> Result<(Box<dyn LlmBackend>, Option<LlmFallbackInfo>), LlmError> {
    let provider = config.llm.provider.as_deref().unwrap_or("ollama");

    match construct_backend_for_provider(provider, config) {
        Ok(backend) => Ok((backend, None)),
        Err(primary_error) => {
            let Some(fallback_provider) = config.llm.fallback_provider.as_deref() else {
                return Err(primary_error);
            };

            let reason = primary_error.to_string();
            warn!(
                primary = provider,
                fallback = fallback_provider,
                %reason,
                "Primary LLM provider failed to construct, attempting fallback"
            );

            match construct_backend_for_provider(fallback_provider, config) {
                Ok(backend) => Ok((
                    backend,
                    Some(LlmFallbackInfo {
                        primary_provider: provider.to_string(),
                        fallback_provider: fallback_provider.to_string(),
                        reason,
                    }),
                )),
                Err(fallback_error) => {
                    warn!(
                        fallback = fallback_provider,
                        error = %fallback_error,
                        "Fallback LLM provider also failed to construct"
                    );
                    // The primary error is the more relevant one to surface
                    Err(primary_error)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_unsupported() {
        let config = Config::default();
        let result = construct_backend_for_provider("bedrock", &config);
        match result {
            Err(LlmError::Unsupported(msg)) => {
                assert!(msg.contains("bedrock"));
                assert!(msg.contains("ollama"));
            }
            _ => panic!("expected Unsupported error"),
        }
    }

    #[test]
    fn test_default_provider_is_ollama() {
        // Ollama constructs without any configuration or API key
        let config = Config::default();
        let (backend, fallback) = from_config_with_fallback(&config).unwrap();
        assert!(fallback.is_none());
        drop(backend);
    }

    #[test]
    fn test_fallback_to_ollama_when_openai_unconfigured() {
        let mut config = Config::default();
        config.llm.provider = Some("openai".to_string());
        config.llm.fallback_provider = Some("ollama".to_string());
        // No [llm.openai] section at all: construction must fail on the
        // missing model before even looking at the API key env.
        let (_, fallback) = from_config_with_fallback(&config).unwrap();
        let info = fallback.expect("fallback should have been used");
        assert_eq!(info.primary_provider, "openai");
        assert_eq!(info.fallback_provider, "ollama");
    }

    #[test]
    fn test_unknown_primary_without_fallback_errors() {
        let mut config = Config::default();
        config.llm.provider = Some("mystery".to_string());
        assert!(matches!(
            from_config_with_fallback(&config),
            Err(LlmError::Unsupported(_))
        ));
    }
}
