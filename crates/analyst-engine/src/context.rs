//! Per-question request state
//!
//! One `RequestContext` exists per question and is the single blackboard
//! the state machine writes into. Every field has exactly one writing step;
//! downstream steps only read.

use analyst_db::QueryOutcome;
use analyst_utils::types::Passage;

use crate::answer::AnswerRecord;

/// Routing strategy for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Document retrieval only; no SQL is generated or executed.
    Rag,
    /// SQL only; retrieval and constraint extraction are skipped entirely.
    Sql,
    /// Retrieval first, then constraint-informed SQL.
    Hybrid,
}

impl Route {
    /// Fallback when classification is unusable.
    pub const FALLBACK: Route = Route::Hybrid;

    /// Normalize a raw classification label.
    ///
    /// The label is case-folded and matched by substring in priority order
    /// `hybrid`, `sql`, `rag`, so a mixed label like "hybrid-sql mix"
    /// resolves to the broadest strategy it names. Anything that matches no
    /// label resolves to [`Route::FALLBACK`].
    #[must_use]
    pub fn resolve(raw: &str) -> Route {
        let folded = raw.to_lowercase();
        if folded.contains("hybrid") {
            Route::Hybrid
        } else if folded.contains("sql") {
            Route::Sql
        } else if folded.contains("rag") {
            Route::Rag
        } else {
            Route::FALLBACK
        }
    }

    /// Whether this route runs query formulation and retrieval.
    #[must_use]
    pub fn needs_retrieval(self) -> bool {
        matches!(self, Route::Rag | Route::Hybrid)
    }

    /// Whether this route runs SQL generation and execution.
    #[must_use]
    pub fn needs_sql(self) -> bool {
        matches!(self, Route::Sql | Route::Hybrid)
    }

    /// Canonical label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Route::Rag => "rag",
            Route::Sql => "sql",
            Route::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested shape of the final answer.
///
/// `Shaped` and `Text` keep the caller's raw hint so the synthesis prompt
/// can pass it through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatHint {
    /// A single integer.
    Int,
    /// A single float, rounded to two decimal places.
    Float,
    /// A JSON list or object; the hint names or sketches the shape.
    Shaped(String),
    /// Free text.
    Text(String),
}

impl FormatHint {
    /// Classify a raw hint string.
    ///
    /// `int` and `float` match exactly (after trimming); a hint mentioning
    /// `list` or containing `{` asks for a JSON shape; everything else is
    /// free text.
    #[must_use]
    pub fn parse(raw: &str) -> FormatHint {
        let trimmed = raw.trim();
        match trimmed {
            "int" => FormatHint::Int,
            "float" => FormatHint::Float,
            _ if trimmed.contains("list") || trimmed.contains('{') => {
                FormatHint::Shaped(trimmed.to_string())
            }
            _ => FormatHint::Text(trimmed.to_string()),
        }
    }

    /// The hint as shown to the synthesis prompt.
    #[must_use]
    pub fn prompt_label(&self) -> &str {
        match self {
            FormatHint::Int => "int",
            FormatHint::Float => "float",
            FormatHint::Shaped(raw) | FormatHint::Text(raw) => raw,
        }
    }
}

/// Mutable state for one question's traversal.
#[derive(Debug)]
pub struct RequestContext {
    /// Stable question identifier, echoed into the answer record.
    pub id: String,
    /// The natural-language question.
    pub question: String,
    /// Requested answer shape.
    pub format_hint: FormatHint,
    /// Set once by the router step.
    pub route: Option<Route>,
    /// Set by query formulation; absent on the sql route.
    pub search_query: Option<String>,
    /// Set by retrieval; `None` means retrieval never ran, `Some(vec![])`
    /// means it ran and found nothing.
    pub retrieved_passages: Option<Vec<Passage>>,
    /// Set by constraint extraction; empty when nothing was retrieved.
    pub extracted_constraints: String,
    /// Most recent candidate SQL; overwritten on each repair attempt.
    pub generated_query: String,
    /// Most recent execution outcome.
    pub execution_result: Option<QueryOutcome>,
    /// Number of failed execution attempts so far.
    pub attempt_count: u32,
    /// Failure message from the most recent failed execution.
    pub last_error: String,
    /// Set by the synthesis step.
    pub final_output: Option<AnswerRecord>,
}

impl RequestContext {
    /// Fresh context for one question.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        format_hint_raw: &str,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            format_hint: FormatHint::parse(format_hint_raw),
            route: None,
            search_query: None,
            retrieved_passages: None,
            extracted_constraints: String::new(),
            generated_query: String::new(),
            execution_result: None,
            attempt_count: 0,
            last_error: String::new(),
            final_output: None,
        }
    }

    /// The resolved route. Only valid after the router step has run.
    #[must_use]
    pub fn route(&self) -> Route {
        self.route.unwrap_or(Route::FALLBACK)
    }

    /// Identifiers of the retrieved passages, in rank order.
    #[must_use]
    pub fn passage_ids(&self) -> Vec<String> {
        self.retrieved_passages
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|p| p.id.clone())
            .collect()
    }
}
