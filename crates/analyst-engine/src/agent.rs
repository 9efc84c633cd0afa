//! The orchestration agent
//!
//! Drives one `RequestContext` from routing to a finished `AnswerRecord`.
//! The agent owns no policy beyond step execution: routing lives in
//! `steps::next_step`, prompt text in `tasks`, and string surgery in
//! `sqlgen`/`coerce`.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use analyst_db::{QueryExecutor, QueryOutcome};
use analyst_index::DocumentIndex;
use analyst_llm::{LlmBackend, LlmInvocation, Message};
use analyst_utils::error::{EngineError, LlmError};
use analyst_utils::text::truncate_with_marker;

use crate::answer::{AnswerRecord, assemble_citations, derive_confidence};
use crate::coerce::coerce_answer;
use crate::context::{RequestContext, Route};
use crate::sqlgen::{PLACEHOLDER_QUERY, clean_sql, with_table_hint};
use crate::steps::{Step, next_step};
use crate::tasks::{self, TaskId};

/// Tunables for one agent instance.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Global traversal ceiling; exceeding it aborts the question.
    pub max_steps: u32,
    /// Passages requested per retrieval.
    pub top_k: usize,
    /// Character budget for document context in the synthesis prompt.
    pub context_budget: usize,
    /// Character budget for the rendered SQL result in the synthesis prompt.
    pub result_budget: usize,
    /// Timeout applied to each inference call.
    pub llm_timeout: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 20,
            top_k: 3,
            context_budget: 600,
            result_budget: 500,
            llm_timeout: Duration::from_secs(120),
        }
    }
}

/// One agent, reusable across questions. Backends are shared behind `Arc`
/// so a batch run builds the index and opens the database once.
pub struct Agent {
    llm: Arc<dyn LlmBackend>,
    index: Arc<dyn DocumentIndex>,
    db: Arc<dyn QueryExecutor>,
    settings: AgentSettings,
}

impl Agent {
    /// Assemble an agent from its three boundaries.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmBackend>,
        index: Arc<dyn DocumentIndex>,
        db: Arc<dyn QueryExecutor>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            llm,
            index,
            db,
            settings,
        }
    }

    /// Run one question to completion.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::StepCeiling` if the traversal exceeds the
    /// configured step ceiling, `EngineError::Inference` when an inference
    /// call with no documented fallback fails, and `EngineError::Index` /
    /// `EngineError::Db` for adapter failures. SQL execution failures are
    /// not errors; they feed the repair loop.
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<AnswerRecord, EngineError> {
        let mut step = Step::Route;
        let mut taken: u32 = 0;

        loop {
            taken += 1;
            if taken > self.settings.max_steps {
                warn!(id = %ctx.id, taken, "Step ceiling exceeded");
                return Err(EngineError::StepCeiling {
                    taken,
                    limit: self.settings.max_steps,
                });
            }
            debug!(id = %ctx.id, step = %step, "Engine step");

            match step {
                Step::Route => self.route(ctx).await,
                Step::FormulateQuery => self.formulate_query(ctx).await?,
                Step::Retrieve => self.retrieve(ctx)?,
                Step::ExtractConstraints => self.extract_constraints(ctx).await?,
                Step::GenerateSql => self.generate_sql(ctx).await?,
                Step::Execute => self.execute(ctx),
                Step::Synthesize => {
                    let record = self.synthesize(ctx).await?;
                    ctx.final_output = Some(record.clone());
                    info!(
                        id = %ctx.id,
                        route = %ctx.route(),
                        attempts = ctx.attempt_count,
                        confidence = record.confidence,
                        "Question finished"
                    );
                    return Ok(record);
                }
                // Synthesize is the only predecessor of Done and returns directly
                Step::Done => unreachable!("terminal state is never entered"),
            }

            step = next_step(step, ctx);
        }
    }

    async fn infer(
        &self,
        ctx: &RequestContext,
        task: TaskId,
        messages: Vec<Message>,
    ) -> Result<String, LlmError> {
        let inv = LlmInvocation::new(
            ctx.id.clone(),
            task.as_str(),
            "",
            self.settings.llm_timeout,
            messages,
        );
        Ok(self.llm.invoke(inv).await?.raw_response)
    }

    /// Classification failures never abort a question: any error or
    /// unusable label resolves to the fallback route.
    async fn route(&self, ctx: &mut RequestContext) {
        let route = match self
            .infer(
                ctx,
                TaskId::Classification,
                tasks::classification_messages(&ctx.question),
            )
            .await
        {
            Ok(raw) => Route::resolve(&raw),
            Err(e) => {
                warn!(id = %ctx.id, error = %e, "Classification failed, using fallback route");
                Route::FALLBACK
            }
        };
        debug!(id = %ctx.id, route = %route, "Routed");
        ctx.route = Some(route);
    }

    async fn formulate_query(&self, ctx: &mut RequestContext) -> Result<(), EngineError> {
        let raw = self
            .infer(
                ctx,
                TaskId::QueryFormulation,
                tasks::query_formulation_messages(&ctx.question),
            )
            .await
            .map_err(|e| EngineError::Inference {
                task: "query-formulation",
                source: e,
            })?;
        ctx.search_query = Some(raw.trim().to_string());
        Ok(())
    }

    fn retrieve(&self, ctx: &mut RequestContext) -> Result<(), EngineError> {
        let query = ctx
            .search_query
            .clone()
            .unwrap_or_else(|| ctx.question.clone());
        let passages = self.index.search(&query, self.settings.top_k)?;
        debug!(id = %ctx.id, hits = passages.len(), "Retrieved passages");
        ctx.retrieved_passages = Some(passages);
        Ok(())
    }

    async fn extract_constraints(&self, ctx: &mut RequestContext) -> Result<(), EngineError> {
        let context: String = ctx
            .retrieved_passages
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        if context.is_empty() {
            // Nothing retrieved: no constraints, and no inference call
            debug!(id = %ctx.id, "No passages; skipping constraint extraction");
            ctx.extracted_constraints = String::new();
            return Ok(());
        }

        let raw = self
            .infer(
                ctx,
                TaskId::ConstraintExtraction,
                tasks::constraint_extraction_messages(&ctx.question, &context),
            )
            .await
            .map_err(|e| EngineError::Inference {
                task: "constraint-extraction",
                source: e,
            })?;
        ctx.extracted_constraints = raw.trim().to_string();
        Ok(())
    }

    /// Generation failures never abort a question: the inert placeholder
    /// query stands in, fails no execution, and yields zero rows.
    async fn generate_sql(&self, ctx: &mut RequestContext) -> Result<(), EngineError> {
        let schema = self.db.schema(None)?;
        let feedback = if ctx.attempt_count > 0 {
            with_table_hint(&ctx.last_error)
        } else {
            String::new()
        };

        let sql = match self
            .infer(
                ctx,
                TaskId::QueryGeneration,
                tasks::query_generation_messages(
                    &ctx.question,
                    &schema,
                    &ctx.extracted_constraints,
                    &feedback,
                ),
            )
            .await
        {
            Ok(raw) => {
                let cleaned = clean_sql(&raw);
                if cleaned.is_empty() {
                    warn!(id = %ctx.id, "Generation produced no SQL, using placeholder");
                    PLACEHOLDER_QUERY.to_string()
                } else {
                    cleaned
                }
            }
            Err(e) => {
                warn!(id = %ctx.id, error = %e, "SQL generation failed, using placeholder");
                PLACEHOLDER_QUERY.to_string()
            }
        };
        ctx.generated_query = sql;
        Ok(())
    }

    fn execute(&self, ctx: &mut RequestContext) {
        let outcome = self.db.execute(&ctx.generated_query);
        if let Some(message) = outcome.failure_message() {
            ctx.attempt_count += 1;
            ctx.last_error = message.to_string();
            warn!(
                id = %ctx.id,
                attempt = ctx.attempt_count,
                error = %message,
                "SQL execution failed"
            );
        } else {
            ctx.last_error.clear();
        }
        ctx.execution_result = Some(outcome);
    }

    async fn synthesize(&self, ctx: &mut RequestContext) -> Result<AnswerRecord, EngineError> {
        let doc_context = ctx
            .retrieved_passages
            .as_deref()
            .unwrap_or_default()
            .first()
            .map(|p| truncate_with_marker(&p.text, self.settings.context_budget))
            .unwrap_or_default();

        let rows = match &ctx.execution_result {
            Some(QueryOutcome::Rows(result)) => {
                let rendered =
                    serde_json::to_string(&result.rows).unwrap_or_else(|_| "[]".to_string());
                truncate_with_marker(&rendered, self.settings.result_budget)
            }
            // Failed or absent execution contributes no rows
            _ => "[]".to_string(),
        };

        let raw = self
            .infer(
                ctx,
                TaskId::AnswerSynthesis,
                tasks::synthesis_messages(
                    &ctx.question,
                    &doc_context,
                    &ctx.generated_query,
                    &rows,
                    ctx.format_hint.prompt_label(),
                ),
            )
            .await
            .map_err(|e| EngineError::Inference {
                task: "answer-synthesis",
                source: e,
            })?;

        let (answer_text, explanation) = tasks::parse_synthesis(&raw);
        let terminal_failure = ctx
            .execution_result
            .as_ref()
            .is_some_and(QueryOutcome::is_failure);

        Ok(AnswerRecord {
            id: ctx.id.clone(),
            final_answer: coerce_answer(&answer_text, &ctx.format_hint),
            sql: ctx.generated_query.clone(),
            confidence: derive_confidence(ctx.attempt_count, terminal_failure),
            explanation,
            citations: assemble_citations(&ctx.passage_ids(), &ctx.generated_query),
        })
    }
}
