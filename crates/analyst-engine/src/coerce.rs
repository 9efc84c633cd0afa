//! Answer-format coercion
//!
//! The synthesis step produces free text; the batch contract promises a
//! typed `final_answer`. Coercion is tolerant: it extracts the first value
//! of the right shape from noisy model output and falls back to a typed
//! default rather than failing the question.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::FormatHint;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

// Decimal alternative first, so "2.5" matches as a whole and not as "2"
static NUMERIC_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?\d*\.\d+|\d+").expect("valid regex"));

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Coerce a raw textual answer into the hinted JSON shape.
///
/// - `Int`: the first run of digits, or `0` if none parses.
/// - `Float`: the first numeric token (sign and decimal point allowed),
///   rounded to two decimal places, or `0.0` if none parses.
/// - `Shaped`: if the text contains a brace or bracket, attempt a JSON
///   parse of the whole trimmed text; on failure fall back to the raw
///   string.
/// - `Text`: the raw string unchanged.
#[must_use]
pub fn coerce_answer(raw: &str, hint: &FormatHint) -> serde_json::Value {
    match hint {
        FormatHint::Int => serde_json::Value::from(extract_int(raw).unwrap_or(0)),
        FormatHint::Float => {
            serde_json::Value::from(extract_float(raw).map_or(0.0, round2))
        }
        FormatHint::Shaped(_) => {
            parse_shaped(raw).unwrap_or_else(|| serde_json::Value::from(raw))
        }
        FormatHint::Text(_) => serde_json::Value::from(raw),
    }
}

fn extract_int(raw: &str) -> Option<i64> {
    DIGIT_RUN.find(raw)?.as_str().parse().ok()
}

fn extract_float(raw: &str) -> Option<f64> {
    NUMERIC_TOKEN.find(raw)?.as_str().parse().ok()
}

fn parse_shaped(raw: &str) -> Option<serde_json::Value> {
    if !raw.contains('{') && !raw.contains('[') {
        return None;
    }
    serde_json::from_str(raw.trim()).ok()
}
