//! Command-line interface for analyst
//!
//! Two commands: `run` drives a JSONL batch, `ask` answers one question and
//! prints the record. Shared setup (config discovery, backend selection,
//! index build, database open) lives in `build_agent`.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use analyst_config::Config;
use analyst_db::SqliteExecutor;
use analyst_engine::{Agent, AgentSettings, RequestContext};
use analyst_index::MarkdownIndex;
use analyst_utils::error::AnalystError;

use crate::batch;
use crate::exit_codes::{codes, exit_code_for};

/// analyst - natural-language analytics over a sales database and policy documents
#[derive(Parser)]
#[command(name = "analyst")]
#[command(about = "Answer analytics questions by routing between document retrieval and SQL")]
#[command(long_about = r#"
analyst answers natural-language questions against a SQLite sales database
and a directory of markdown policy/definition documents. Each question is
classified as rag (documents only), sql (database only), or hybrid
(document-defined terms applied to database figures), then driven through
retrieval, SQL generation with a bounded repair loop, and answer synthesis.

EXAMPLES:
  # Answer a batch of questions, one JSON object per line
  analyst run --batch questions.jsonl --out answers.jsonl

  # Ask a single question
  analyst ask "How many orders shipped in June 1997?" --format-hint int

CONFIGURATION:
  Configuration is read from analyst.toml in the current directory, or from
  an explicit --config path. Defaults target a local ollama server.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a batch of questions from a JSONL file
    Run {
        /// Input file: one {"id", "question", "format_hint"} object per line
        #[arg(long)]
        batch: Utf8PathBuf,

        /// Output file, one answer record per line (truncated at start)
        #[arg(long)]
        out: Utf8PathBuf,
    },
    /// Answer one question and print the answer record as JSON
    Ask {
        /// The natural-language question
        question: String,

        /// Requested answer format: int, float, a list/object sketch, or free text
        #[arg(long, default_value = "free text")]
        format_hint: String,

        /// Question id echoed into the record
        #[arg(long, default_value = "adhoc")]
        id: String,
    },
}

/// CLI entry point. Returns the process exit code; never exits directly.
#[must_use]
pub fn run() -> i32 {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Failed to start async runtime");
            return codes::FAILURE;
        }
    };

    match runtime.block_on(execute(cli)) {
        Ok(()) => codes::SUCCESS,
        Err(e) => {
            error!(error = %e, "analyst failed");
            exit_code_for(&e)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(cli: Cli) -> Result<(), AnalystError> {
    let config = Config::discover(cli.config.as_deref())?;
    config.validate()?;

    let agent = build_agent(&config)?;

    match cli.command {
        Commands::Run { batch, out } => {
            let summary = batch::run_batch(&agent, &batch, &out).await?;
            info!(
                answered = summary.answered,
                degraded = summary.degraded,
                skipped = summary.skipped,
                out = %out,
                "Run finished"
            );
            Ok(())
        }
        Commands::Ask {
            question,
            format_hint,
            id,
        } => {
            let mut ctx = RequestContext::new(id.as_str(), question.as_str(), &format_hint);
            let record = agent.run(&mut ctx).await.map_err(AnalystError::Engine)?;
            let json = serde_json::to_string_pretty(&record).map_err(std::io::Error::other)?;
            println!("{json}");
            Ok(())
        }
    }
}

fn build_agent(config: &Config) -> Result<Agent, AnalystError> {
    let (backend, fallback) = analyst_llm::from_config_with_fallback(config)?;
    if let Some(info) = fallback {
        info!(
            primary = %info.primary_provider,
            fallback = %info.fallback_provider,
            "Using fallback LLM provider"
        );
    }

    let index = MarkdownIndex::open(&config.data.docs_dir)?;
    let db = SqliteExecutor::open(&config.data.database)?;

    let settings = AgentSettings {
        max_steps: config.engine.max_steps,
        top_k: config.engine.top_k,
        context_budget: config.engine.context_budget,
        result_budget: config.engine.result_budget,
        llm_timeout: config.llm_timeout(),
    };

    Ok(Agent::new(
        Arc::from(backend),
        Arc::new(index),
        Arc::new(db),
        settings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_command_parses() {
        let cli = Cli::parse_from([
            "analyst",
            "run",
            "--batch",
            "questions.jsonl",
            "--out",
            "answers.jsonl",
        ]);
        match cli.command {
            Commands::Run { batch, out } => {
                assert_eq!(batch, Utf8PathBuf::from("questions.jsonl"));
                assert_eq!(out, Utf8PathBuf::from("answers.jsonl"));
            }
            Commands::Ask { .. } => panic!("expected run command"),
        }
    }

    #[test]
    fn test_ask_command_defaults() {
        let cli = Cli::parse_from(["analyst", "ask", "How many orders?"]);
        match cli.command {
            Commands::Ask {
                question,
                format_hint,
                id,
            } => {
                assert_eq!(question, "How many orders?");
                assert_eq!(format_hint, "free text");
                assert_eq!(id, "adhoc");
            }
            Commands::Run { .. } => panic!("expected ask command"),
        }
    }
}
