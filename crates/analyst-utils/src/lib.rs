//! Shared types and error taxonomy for the analyst workspace
//!
//! Every other crate in the workspace depends on this one for its error
//! enums and the handful of types that cross crate boundaries (retrieved
//! passages, text truncation helpers).

pub mod error;
pub mod text;
pub mod types;

pub use error::{AnalystError, ConfigError, DbError, EngineError, IndexError, LlmError};
pub use types::Passage;
