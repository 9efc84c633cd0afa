//! analyst - natural-language analytics over a sales database and policy documents
//!
//! The workspace splits by concern:
//! - `analyst-utils`: error taxonomy and shared types
//! - `analyst-config`: TOML configuration and discovery
//! - `analyst-llm`: provider backends behind the `LlmBackend` trait
//! - `analyst-index`: markdown chunking and BM25 retrieval
//! - `analyst-db`: SQLite execution and schema introspection
//! - `analyst-engine`: the routing/repair/synthesis state machine
//!
//! This crate is the CLI shell: argument parsing, logging setup, the JSONL
//! batch driver, and exit-code mapping.

pub mod batch;
pub mod cli;
pub mod exit_codes;

pub use analyst_config::Config;
pub use analyst_db::{DOMAIN_TABLES, QueryExecutor, QueryOutcome, SqliteExecutor, TableResult};
pub use analyst_engine::{
    Agent, AgentSettings, AnswerRecord, FormatHint, RequestContext, Route,
};
pub use analyst_index::{DocumentIndex, MarkdownIndex};
pub use analyst_llm::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
pub use analyst_utils::error::AnalystError;
pub use analyst_utils::types::Passage;
pub use batch::{BatchQuestion, BatchSummary, run_batch};
