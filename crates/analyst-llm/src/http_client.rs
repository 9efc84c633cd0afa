//! Shared HTTP client with bounded retry for provider backends

use std::time::Duration;
use tracing::{debug, warn};

use analyst_utils::error::LlmError;

/// Maximum send attempts per request (initial try plus retries).
const MAX_ATTEMPTS: u32 = 3;

/// Base backoff delay; doubled per retry.
const BACKOFF_BASE_MS: u64 = 500;

/// Thin wrapper over `reqwest::Client` applying a uniform retry and
/// status-code mapping policy for all HTTP providers.
///
/// Retryable: transport errors, 429, and 5xx. Not retryable: 401/403 and
/// other 4xx — those indicate a request that will not succeed on resend.
pub(crate) struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the underlying client cannot
    /// be constructed (TLS backend initialization).
    pub fn new() -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("HTTP client construction: {e}")))?;
        Ok(Self { client })
    }

    /// Access the underlying client for building requests.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Execute a request with the retry policy, returning the successful
    /// response.
    ///
    /// # Errors
    ///
    /// Returns the mapped `LlmError` from the final attempt.
    pub async fn execute_with_retry(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
        provider: &str,
    ) -> Result<reqwest::Response, LlmError> {
        let mut last_error = LlmError::Transport("no attempt executed".to_string());

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = Duration::from_millis(BACKOFF_BASE_MS << (attempt - 1));
                debug!(provider, attempt, delay_ms = delay.as_millis() as u64, "Retrying request");
                tokio::time::sleep(delay).await;
            }

            let Some(req) = request.try_clone() else {
                // Streaming bodies cannot be cloned; all provider requests
                // here are JSON, so this indicates a programming error.
                return Err(LlmError::Transport(
                    "request body is not retryable".to_string(),
                ));
            };

            let outcome = req.timeout(timeout).send().await;

            match outcome {
                Err(e) if e.is_timeout() => {
                    return Err(LlmError::Timeout { duration: timeout });
                }
                Err(e) => {
                    warn!(provider, attempt, error = %e, "Transport error");
                    last_error = LlmError::Transport(format!("{provider} request failed: {e}"));
                }
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let body = response.text().await.unwrap_or_default();
                    let snippet: String = body.chars().take(200).collect();

                    match status.as_u16() {
                        401 | 403 => {
                            return Err(LlmError::ProviderAuth(format!(
                                "{provider} returned {status}: {snippet}"
                            )));
                        }
                        429 => {
                            warn!(provider, attempt, "Provider quota response");
                            last_error = LlmError::ProviderQuota(format!(
                                "{provider} returned 429: {snippet}"
                            ));
                        }
                        500..=599 => {
                            warn!(provider, attempt, status = status.as_u16(), "Provider outage response");
                            last_error = LlmError::ProviderOutage(format!(
                                "{provider} returned {status}: {snippet}"
                            ));
                        }
                        _ => {
                            return Err(LlmError::Transport(format!(
                                "{provider} returned {status}: {snippet}"
                            )));
                        }
                    }
                }
            }
        }

        Err(last_error)
    }
}
