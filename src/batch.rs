//! JSONL batch driver
//!
//! Reads one question per line, runs each through the agent, and appends
//! one answer record per question to the output file. Per-question failures
//! degrade to a null-answer record; they never abort the batch. The output
//! is truncated up front and flushed after every record, so a partial run
//! leaves a valid, current file behind.

use camino::Utf8Path;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use tracing::{info, warn};

use analyst_engine::{Agent, AnswerRecord, RequestContext};
use analyst_utils::error::AnalystError;

/// One input line of the batch file.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchQuestion {
    /// Stable question identifier, echoed into the answer record.
    pub id: String,
    /// The natural-language question.
    pub question: String,
    /// Requested answer format; free text when absent.
    #[serde(default = "default_format_hint")]
    pub format_hint: String,
}

fn default_format_hint() -> String {
    "free text".to_string()
}

/// Counters for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Questions answered normally.
    pub answered: usize,
    /// Questions that failed and produced a degraded record.
    pub degraded: usize,
    /// Malformed input lines skipped.
    pub skipped: usize,
}

/// Run every question in `input`, writing one JSONL record per question to
/// `output`.
///
/// # Errors
///
/// Returns `AnalystError::Io` when the input cannot be read or the output
/// cannot be written. Per-question engine errors are not errors here; they
/// produce degraded records.
pub async fn run_batch(
    agent: &Agent,
    input: &Utf8Path,
    output: &Utf8Path,
) -> Result<BatchSummary, AnalystError> {
    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    let mut summary = BatchSummary::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let question: BatchQuestion = match serde_json::from_str(&line) {
            Ok(q) => q,
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "Skipping malformed input line");
                summary.skipped += 1;
                continue;
            }
        };

        let mut ctx = RequestContext::new(
            question.id.as_str(),
            question.question.as_str(),
            &question.format_hint,
        );
        let record = match agent.run(&mut ctx).await {
            Ok(record) => {
                summary.answered += 1;
                record
            }
            Err(e) => {
                warn!(id = %question.id, error = %e, "Question failed, emitting degraded record");
                summary.degraded += 1;
                AnswerRecord::degraded(question.id, format!("processing failed: {e}"))
            }
        };

        let json = serde_json::to_string(&record).map_err(std::io::Error::other)?;
        writeln!(writer, "{json}")?;
        writer.flush()?;
    }

    info!(
        answered = summary.answered,
        degraded = summary.degraded,
        skipped = summary.skipped,
        "Batch complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_parses_with_default_hint() {
        let q: BatchQuestion =
            serde_json::from_str(r#"{"id": "q1", "question": "How many orders?"}"#).unwrap();
        assert_eq!(q.id, "q1");
        assert_eq!(q.format_hint, "free text");
    }

    #[test]
    fn test_question_parses_explicit_hint() {
        let q: BatchQuestion = serde_json::from_str(
            r#"{"id": "q2", "question": "Average price?", "format_hint": "float"}"#,
        )
        .unwrap();
        assert_eq!(q.format_hint, "float");
    }

    #[test]
    fn test_missing_required_fields_fail_parsing() {
        assert!(serde_json::from_str::<BatchQuestion>(r#"{"id": "q3"}"#).is_err());
        assert!(serde_json::from_str::<BatchQuestion>("not json").is_err());
    }
}
