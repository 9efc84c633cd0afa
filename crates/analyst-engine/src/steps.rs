//! Step graph
//!
//! The engine is a flat state machine: each step does one thing to the
//! request context, and `next_step` picks the successor from the context
//! alone. Keeping routing in one pure function makes the whole traversal
//! table-testable without any backends.

use crate::context::{RequestContext, Route};

/// Failed executions are retried while `attempt_count` is at or below this
/// bound, giving at most three generate/execute cycles per question.
pub const MAX_REPAIR_ATTEMPTS: u32 = 2;

/// One step of a question's traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Classify the question into a route.
    Route,
    /// Formulate the document search query.
    FormulateQuery,
    /// Retrieve passages from the document index.
    Retrieve,
    /// Extract constraints from the retrieved passages.
    ExtractConstraints,
    /// Generate (or repair) a SQL candidate.
    GenerateSql,
    /// Execute the candidate.
    Execute,
    /// Synthesize and coerce the final answer.
    Synthesize,
    /// Terminal state.
    Done,
}

impl Step {
    /// Short name for logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Route => "route",
            Step::FormulateQuery => "formulate-query",
            Step::Retrieve => "retrieve",
            Step::ExtractConstraints => "extract-constraints",
            Step::GenerateSql => "generate-sql",
            Step::Execute => "execute",
            Step::Synthesize => "synthesize",
            Step::Done => "done",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successor of `current` given the context written so far.
#[must_use]
pub fn next_step(current: Step, ctx: &RequestContext) -> Step {
    match current {
        Step::Route => {
            if ctx.route().needs_retrieval() {
                Step::FormulateQuery
            } else {
                Step::GenerateSql
            }
        }
        Step::FormulateQuery => Step::Retrieve,
        Step::Retrieve => Step::ExtractConstraints,
        Step::ExtractConstraints => {
            if ctx.route() == Route::Rag {
                Step::Synthesize
            } else {
                Step::GenerateSql
            }
        }
        Step::GenerateSql => Step::Execute,
        Step::Execute => {
            let failed = ctx
                .execution_result
                .as_ref()
                .is_some_and(analyst_db::QueryOutcome::is_failure);
            if failed && ctx.attempt_count <= MAX_REPAIR_ATTEMPTS {
                Step::GenerateSql
            } else {
                Step::Synthesize
            }
        }
        Step::Synthesize | Step::Done => Step::Done,
    }
}
