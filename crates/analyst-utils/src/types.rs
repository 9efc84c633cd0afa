//! Types shared across crate boundaries

use serde::{Deserialize, Serialize};

/// A scored unit of retrieved text with a stable identifier.
///
/// Identifiers are stable across runs for the same corpus (derived from the
/// source file name and chunk position), which is what makes them usable as
/// citations in answer records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Stable chunk identifier, e.g. `product_policy.md::chunk3`
    pub id: String,
    /// Full chunk text, including its source/context header lines
    pub text: String,
    /// Source document file name
    pub source: String,
    /// Relevance score (BM25); higher is more relevant
    pub score: f32,
}

impl Passage {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        source: impl Into<String>,
        score: f32,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: source.into(),
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passage_roundtrips_through_json() {
        let p = Passage::new("kpi.md::chunk0", "Content", "kpi.md", 1.5);
        let json = serde_json::to_string(&p).unwrap();
        let back: Passage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
