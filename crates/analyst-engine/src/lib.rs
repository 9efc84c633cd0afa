//! Orchestration engine for analyst
//!
//! One question enters as a `RequestContext`; the `Agent` walks it through
//! routing, retrieval, constraint extraction, a bounded SQL repair loop,
//! and synthesis, and an `AnswerRecord` comes out. The three backends
//! (inference, document index, query executor) are trait objects, so the
//! whole machine is testable with scripted fakes.

mod agent;
mod answer;
mod coerce;
mod context;
mod sqlgen;
mod steps;
mod tasks;

pub use agent::{Agent, AgentSettings};
pub use answer::{AnswerRecord, assemble_citations, derive_confidence};
pub use coerce::{coerce_answer, round2};
pub use context::{FormatHint, RequestContext, Route};
pub use sqlgen::{PLACEHOLDER_QUERY, clean_sql, with_table_hint};
pub use steps::{MAX_REPAIR_ATTEMPTS, Step, next_step};
pub use tasks::{TaskId, parse_synthesis};
