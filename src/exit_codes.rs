//! Exit code constants and error mapping for the analyst CLI
//!
//! Library code returns `AnalystError`; only the CLI maps errors to process
//! exit codes, and only `main` calls `std::process::exit`.

use analyst_utils::error::{AnalystError, LlmError};

/// Exit code constants for analyst
pub mod codes {
    /// Success
    pub const SUCCESS: i32 = 0;

    /// Generic failure
    pub const FAILURE: i32 = 1;

    /// Invalid CLI arguments or configuration
    pub const CLI_ARGS: i32 = 2;

    /// Inference exceeded its timeout
    pub const TIMEOUT: i32 = 10;

    /// Data source problem: database or docs directory missing or unreadable
    pub const DATA_SOURCE: i32 = 66;

    /// LLM provider failure (transport, auth, quota, outage)
    pub const PROVIDER_FAILURE: i32 = 70;
}

/// Map an error to its process exit code.
#[must_use]
pub fn exit_code_for(error: &AnalystError) -> i32 {
    match error {
        AnalystError::Config(_) => codes::CLI_ARGS,
        AnalystError::Index(_) | AnalystError::Db(_) | AnalystError::Io(_) => codes::DATA_SOURCE,
        AnalystError::Llm(llm) => llm_exit_code(llm),
        AnalystError::Engine(engine) => {
            use analyst_utils::error::EngineError;
            match engine {
                EngineError::Inference { source, .. } => llm_exit_code(source),
                EngineError::Index(_) | EngineError::Db(_) => codes::DATA_SOURCE,
                EngineError::StepCeiling { .. } => codes::FAILURE,
            }
        }
    }
}

fn llm_exit_code(error: &LlmError) -> i32 {
    match error {
        LlmError::Timeout { .. } => codes::TIMEOUT,
        LlmError::Misconfiguration(_) | LlmError::Unsupported(_) => codes::CLI_ARGS,
        LlmError::Transport(_)
        | LlmError::ProviderAuth(_)
        | LlmError::ProviderQuota(_)
        | LlmError::ProviderOutage(_) => codes::PROVIDER_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_utils::error::{ConfigError, DbError, EngineError};

    #[test]
    fn test_config_errors_are_cli_args() {
        let err = AnalystError::Config(ConfigError::Invalid {
            key: "llm.provider".to_string(),
            reason: "unknown".to_string(),
        });
        assert_eq!(exit_code_for(&err), codes::CLI_ARGS);
    }

    #[test]
    fn test_data_source_errors() {
        let err = AnalystError::Db(DbError::Open {
            path: "missing.sqlite".to_string(),
            reason: "no such file".to_string(),
        });
        assert_eq!(exit_code_for(&err), codes::DATA_SOURCE);
    }

    #[test]
    fn test_timeout_maps_through_engine_error() {
        let err = AnalystError::Engine(EngineError::Inference {
            task: "answer-synthesis",
            source: LlmError::Timeout {
                duration: std::time::Duration::from_secs(120),
            },
        });
        assert_eq!(exit_code_for(&err), codes::TIMEOUT);
    }

    #[test]
    fn test_provider_failures() {
        let err = AnalystError::Llm(LlmError::ProviderOutage("503".to_string()));
        assert_eq!(exit_code_for(&err), codes::PROVIDER_FAILURE);
    }

    #[test]
    fn test_step_ceiling_is_generic_failure() {
        let err = AnalystError::Engine(EngineError::StepCeiling {
            taken: 21,
            limit: 20,
        });
        assert_eq!(exit_code_for(&err), codes::FAILURE);
    }
}
