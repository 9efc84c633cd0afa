//! Answer records, confidence, and citations

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use analyst_db::DOMAIN_TABLES;

use crate::coerce::round2;

/// One finished answer, serialized as one JSONL line by the batch driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Question identifier, echoed from the input.
    pub id: String,
    /// Coerced answer value; `null` when the question could not be answered.
    pub final_answer: serde_json::Value,
    /// Final candidate SQL; empty when no SQL step ran.
    pub sql: String,
    /// Derived confidence in `[0.0, 1.0]`, two decimal places.
    pub confidence: f64,
    /// Model-provided explanation, possibly empty.
    pub explanation: String,
    /// Passage ids and domain table names that fed the answer, sorted.
    pub citations: Vec<String>,
}

impl AnswerRecord {
    /// A record for a question whose run aborted before synthesis.
    #[must_use]
    pub fn degraded(id: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            final_answer: serde_json::Value::Null,
            sql: String::new(),
            confidence: 0.0,
            explanation: explanation.into(),
            citations: Vec::new(),
        }
    }
}

/// Derive confidence from the repair history.
///
/// Each failed execution attempt costs 0.2; a run whose final execution
/// still failed scores 0.0 outright. The result is clamped at zero and
/// rounded to two decimal places.
#[must_use]
pub fn derive_confidence(attempt_count: u32, terminal_failure: bool) -> f64 {
    if terminal_failure {
        return 0.0;
    }
    round2((1.0 - 0.2 * f64::from(attempt_count)).max(0.0))
}

/// Assemble citations: every retrieved passage id, plus every domain table
/// whose name appears as a substring of the final SQL (bare or quoted).
/// Deduplicated and sorted for deterministic output.
#[must_use]
pub fn assemble_citations(passage_ids: &[String], sql: &str) -> Vec<String> {
    let mut cited: BTreeSet<String> = passage_ids.iter().cloned().collect();
    for table in DOMAIN_TABLES {
        if sql.contains(table) {
            cited.insert((*table).to_string());
        }
    }
    cited.into_iter().collect()
}
