//! Configuration management for analyst
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI arguments > config file > built-in defaults. The config file is TOML
//! with `[llm]`, `[engine]`, and `[data]` sections.
//!
//! ```toml
//! [llm]
//! provider = "ollama"
//!
//! [llm.ollama]
//! base_url = "http://localhost:11434"
//! model = "phi3.5:3.8b-mini-instruct-q4_K_M"
//!
//! [engine]
//! max_steps = 20
//! top_k = 3
//!
//! [data]
//! database = "data/northwind.sqlite"
//! docs_dir = "docs"
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use analyst_utils::error::ConfigError;

/// Default config file name for discovery in the working directory.
pub const CONFIG_FILE_NAME: &str = "analyst.toml";

/// Default per-call LLM timeout in seconds.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Top-level configuration for analyst operations.
///
/// Use [`Config::discover`] for CLI-like behavior (explicit path if given,
/// otherwise `./analyst.toml` if present, otherwise built-in defaults), or
/// [`Config::load`] to read a specific file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider selection and per-provider settings
    pub llm: LlmConfig,
    /// Orchestration engine tuning
    pub engine: EngineSection,
    /// Data locations (SQLite database, policy documents)
    pub data: DataConfig,
}

/// `[llm]` section: provider selection plus per-provider tables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "ollama" (default) or "openai"
    pub provider: Option<String>,
    /// Optional fallback provider used when the primary fails to construct
    pub fallback_provider: Option<String>,
    /// Per-call timeout in seconds (default: 120)
    pub timeout_secs: Option<u64>,
    /// Ollama-specific settings
    pub ollama: Option<OllamaConfig>,
    /// OpenAI-compatible HTTP settings
    pub openai: Option<OpenAiConfig>,
}

/// `[llm.ollama]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server (default: `http://localhost:11434`)
    pub base_url: Option<String>,
    /// Model name, e.g. `phi3.5:3.8b-mini-instruct-q4_K_M`
    pub model: Option<String>,
    /// Sampling temperature (default: 0.2)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate (default: 1024)
    pub max_tokens: Option<u32>,
}

/// `[llm.openai]` section for any OpenAI-compatible endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Environment variable holding the API key (default: `OPENAI_API_KEY`)
    pub api_key_env: Option<String>,
    /// Chat-completions endpoint URL
    pub base_url: Option<String>,
    /// Model name
    pub model: Option<String>,
    /// Sampling temperature (default: 0.2)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate (default: 1024)
    pub max_tokens: Option<u32>,
}

/// `[engine]` section: state-machine tuning parameters.
///
/// `max_steps` is the global traversal ceiling guarding against cyclic
/// routing; it is an operational tuning parameter, not a correctness bound —
/// the repair loop carries its own hard 3-attempt limit regardless.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSection {
    /// Global step ceiling per question (default: 20)
    pub max_steps: u32,
    /// Passages fetched per retrieval (default: 3)
    pub top_k: usize,
    /// Character budget for the synthesis context string (default: 600)
    pub context_budget: usize,
    /// Character budget for the rendered SQL result rows (default: 500)
    pub result_budget: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_steps: 20,
            top_k: 3,
            context_budget: 600,
            result_budget: 500,
        }
    }
}

/// `[data]` section: where the database and documents live.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path to the SQLite database file
    pub database: Utf8PathBuf,
    /// Directory containing the policy/definition markdown documents
    pub docs_dir: Utf8PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            database: Utf8PathBuf::from("data/northwind.sqlite"),
            docs_dir: Utf8PathBuf::from("docs"),
        }
    }
}

impl Config {
    /// Load configuration from a specific TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist,
    /// `ConfigError::Parse` if it is not valid TOML, or
    /// `ConfigError::Invalid` if validation fails.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_string(),
            });
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Discover configuration: explicit path, then `./analyst.toml`, then
    /// built-in defaults.
    ///
    /// An explicit path that does not exist is an error; a missing
    /// `./analyst.toml` is not.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an explicit path is missing or any found
    /// file fails to parse or validate.
    pub fn discover(explicit: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let local = Utf8PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load(&local);
        }
        Ok(Self::default())
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = self.llm.provider.as_deref()
            && !matches!(provider, "ollama" | "openai")
        {
            return Err(ConfigError::Invalid {
                key: "llm.provider".to_string(),
                reason: format!("unknown provider '{provider}', expected 'ollama' or 'openai'"),
            });
        }
        if self.engine.max_steps == 0 {
            return Err(ConfigError::Invalid {
                key: "engine.max_steps".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.engine.top_k == 0 {
            return Err(ConfigError::Invalid {
                key: "engine.top_k".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.engine.context_budget == 0 || self.engine.result_budget == 0 {
            return Err(ConfigError::Invalid {
                key: "engine.context_budget".to_string(),
                reason: "character budgets must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Effective per-call LLM timeout.
    #[must_use]
    pub fn llm_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.llm.timeout_secs.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS))
    }
}
