//! Error taxonomy for analyst
//!
//! Each concern (config, LLM transport, document index, database, engine)
//! carries its own `thiserror` enum; `AnalystError` wraps them for callers
//! that need a single library-level error type. Library code returns these
//! and never calls `std::process::exit()` — exit-code mapping lives in the
//! CLI crate.

use std::time::Duration;
use thiserror::Error;

/// Library-level error type wrapping all per-concern errors.
#[derive(Error, Debug)]
pub enum AnalystError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Document index error: {0}")]
    Index(#[from] IndexError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration file and discovery errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: String },

    #[error("Failed to parse config at {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid config value for '{key}': {reason}")]
    Invalid { key: String, reason: String },

    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM backend errors.
///
/// Transport-level and provider-level failures are distinguished so the
/// retry policy can treat quota/outage responses differently from
/// unrecoverable auth or configuration problems.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, malformed response)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Document index errors.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Docs directory not found: {path}")]
    DocsDirNotFound { path: String },

    #[error("Failed to build index: {0}")]
    Build(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("IO error reading docs: {0}")]
    Io(#[from] std::io::Error),
}

/// Database errors.
///
/// Note that a failing SQL statement is NOT a `DbError`: execution failures
/// are data (they feed the repair loop) and travel inside `QueryOutcome`.
/// `DbError` covers failures of the adapter itself.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to open database at {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("Schema introspection failed: {0}")]
    Schema(String),
}

/// Orchestration engine errors.
///
/// Only failures that abort a question's run appear here; recoverable
/// conditions (SQL execution errors, unparseable answers) are handled
/// inside the state machine and never surface as `EngineError`.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The global traversal ceiling was exceeded — a cyclic-routing guard,
    /// independent of the repair loop's own attempt bound.
    #[error("Step ceiling exceeded: {taken} steps taken, limit is {limit}")]
    StepCeiling { taken: u32, limit: u32 },

    /// An inference call failed at a step with no documented fallback.
    #[error("Inference failed during {task}: {source}")]
    Inference {
        task: &'static str,
        #[source]
        source: LlmError,
    },

    /// Document retrieval failed.
    #[error("Retrieval failed: {0}")]
    Index(#[from] IndexError),

    /// Schema introspection or another adapter-level database failure.
    #[error("Database adapter failed: {0}")]
    Db(#[from] DbError),
}
