//! Inference task definitions
//!
//! Five inference tasks drive a question through the machine. Each task has
//! a stable identifier (carried on the invocation for logging) and a prompt
//! builder. Prompts are plain chat messages; no provider sees anything
//! task-specific beyond the text.

use analyst_llm::Message;

/// Stable inference task identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskId {
    /// Route classification
    Classification,
    /// Search query formulation
    QueryFormulation,
    /// Constraint extraction from retrieved passages
    ConstraintExtraction,
    /// SQL candidate generation
    QueryGeneration,
    /// Final answer synthesis
    AnswerSynthesis,
}

impl TaskId {
    /// Identifier string used on invocations and in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskId::Classification => "classification",
            TaskId::QueryFormulation => "query-formulation",
            TaskId::ConstraintExtraction => "constraint-extraction",
            TaskId::QueryGeneration => "query-generation",
            TaskId::AnswerSynthesis => "answer-synthesis",
        }
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt for route classification. The model answers with a single label.
#[must_use]
pub fn classification_messages(question: &str) -> Vec<Message> {
    vec![
        Message::system(
            "You classify analytics questions by the evidence they need.\n\
             Answer with exactly one word:\n\
             - rag: answered from policy and definition documents alone\n\
             - sql: answered from the sales database alone\n\
             - hybrid: needs a document-defined term or rule applied to database figures",
        ),
        Message::user(format!("Question: {question}\nLabel:")),
    ]
}

/// Prompt for search query formulation.
#[must_use]
pub fn query_formulation_messages(question: &str) -> Vec<Message> {
    vec![
        Message::system(
            "Rewrite the question as a short keyword search query for a document \
             index of business policies and metric definitions. Output only the \
             query terms, no punctuation or commentary.",
        ),
        Message::user(format!("Question: {question}\nSearch query:")),
    ]
}

/// Prompt for constraint extraction over retrieved passages.
#[must_use]
pub fn constraint_extraction_messages(question: &str, context: &str) -> Vec<Message> {
    vec![
        Message::system(
            "From the context passages, extract the definitions, formulas, date \
             ranges, and rules that bear on the question. State each constraint \
             on its own line. If nothing in the context applies, output nothing.",
        ),
        Message::user(format!(
            "Context:\n{context}\n\nQuestion: {question}\nConstraints:"
        )),
    ]
}

/// Prompt for SQL candidate generation. `error_feedback` is empty on the
/// first attempt and carries the previous failure (plus any hint) on
/// repair attempts.
#[must_use]
pub fn query_generation_messages(
    question: &str,
    schema: &str,
    constraints: &str,
    error_feedback: &str,
) -> Vec<Message> {
    let mut user = format!("Schema:\n{schema}\n");
    if !constraints.is_empty() {
        user.push_str(&format!("\nConstraints to honor:\n{constraints}\n"));
    }
    if !error_feedback.is_empty() {
        user.push_str(&format!(
            "\nYour previous query failed with:\n{error_feedback}\nWrite a corrected query.\n"
        ));
    }
    user.push_str(&format!("\nQuestion: {question}\nSQL:"));

    vec![
        Message::system(
            "Write a single SQLite SELECT statement that answers the question \
             against the given schema. The order line items table must be \
             written exactly as \"Order Details\", double-quoted. Output only \
             SQL, with no markdown fences and no commentary.",
        ),
        Message::user(user),
    ]
}

/// Prompt for final answer synthesis.
#[must_use]
pub fn synthesis_messages(
    question: &str,
    context: &str,
    sql: &str,
    rows: &str,
    format_hint: &str,
) -> Vec<Message> {
    vec![
        Message::system(
            "Answer the question from the evidence below. Respond in exactly \
             this form:\n\
             answer: <value matching the requested format>\n\
             explanation: <one or two sentences>",
        ),
        Message::user(format!(
            "Question: {question}\n\
             Requested format: {format_hint}\n\
             Document context:\n{context}\n\
             SQL executed: {sql}\n\
             SQL result rows: {rows}\n"
        )),
    ]
}

/// Split a synthesis response into `(answer, explanation)`.
///
/// Field markers are matched case-insensitively. A response with no
/// `answer:` marker is taken wholesale as the answer with an empty
/// explanation, so a model that ignores the form still yields something
/// coercible.
#[must_use]
pub fn parse_synthesis(raw: &str) -> (String, String) {
    let Some(answer_at) = find_marker(raw, "answer:", 0) else {
        return (raw.trim().to_string(), String::new());
    };
    let after_answer = answer_at + "answer:".len();

    match find_marker(raw, "explanation:", after_answer) {
        Some(explanation_at) => {
            let answer = raw[after_answer..explanation_at].trim().to_string();
            let explanation = raw[explanation_at + "explanation:".len()..]
                .trim()
                .to_string();
            (answer, explanation)
        }
        None => (raw[after_answer..].trim().to_string(), String::new()),
    }
}

// ASCII-case-insensitive marker search. Matching on bytes keeps offsets
// aligned with `raw` even when the surrounding text is non-ASCII; an
// all-ASCII match can only start on a char boundary.
fn find_marker(haystack: &str, marker: &str, from: usize) -> Option<usize> {
    haystack.as_bytes()[from..]
        .windows(marker.len())
        .position(|w| w.eq_ignore_ascii_case(marker.as_bytes()))
        .map(|p| p + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_ids_are_stable() {
        assert_eq!(TaskId::Classification.as_str(), "classification");
        assert_eq!(TaskId::QueryGeneration.as_str(), "query-generation");
        assert_eq!(TaskId::AnswerSynthesis.to_string(), "answer-synthesis");
    }

    #[test]
    fn test_parse_synthesis_both_fields() {
        let (answer, explanation) =
            parse_synthesis("answer: 14\nexplanation: Count of 1997 beverage orders.");
        assert_eq!(answer, "14");
        assert_eq!(explanation, "Count of 1997 beverage orders.");
    }

    #[test]
    fn test_parse_synthesis_case_insensitive_markers() {
        let (answer, explanation) = parse_synthesis("Answer: 3.50\nExplanation: average price");
        assert_eq!(answer, "3.50");
        assert_eq!(explanation, "average price");
    }

    #[test]
    fn test_parse_synthesis_multiline_answer() {
        let raw = "answer: [\"Chai\",\n\"Chang\"]\nexplanation: top sellers";
        let (answer, explanation) = parse_synthesis(raw);
        assert_eq!(answer, "[\"Chai\",\n\"Chang\"]");
        assert_eq!(explanation, "top sellers");
    }

    #[test]
    fn test_parse_synthesis_missing_markers_takes_whole_text() {
        let (answer, explanation) = parse_synthesis("  just 42  ");
        assert_eq!(answer, "just 42");
        assert!(explanation.is_empty());
    }

    #[test]
    fn test_parse_synthesis_answer_only() {
        let (answer, explanation) = parse_synthesis("answer: 7");
        assert_eq!(answer, "7");
        assert!(explanation.is_empty());
    }

    #[test]
    fn test_generation_prompt_carries_feedback_only_on_repair() {
        let first = query_generation_messages("q", "Table: Orders", "", "");
        assert!(!first[1].content.contains("previous query failed"));

        let repair =
            query_generation_messages("q", "Table: Orders", "", "no such table: OrderDetails");
        assert!(repair[1].content.contains("no such table: OrderDetails"));
        assert!(repair[1].content.contains("corrected query"));
    }

    #[test]
    fn test_synthesis_prompt_includes_format_hint() {
        let messages = synthesis_messages("q", "", "SELECT 1", "[[1]]", "int");
        assert!(messages[1].content.contains("Requested format: int"));
    }
}
