//! SQL candidate post-processing
//!
//! Small models wrap SQL in markdown fences, preface it with chatter, and
//! misspell the one table name that needs quoting. Cleaning is mechanical
//! string surgery applied to every candidate before execution, so the
//! repair loop only ever sees genuinely semantic failures.

use once_cell::sync::Lazy;
use regex::Regex;

/// Executed in place of a candidate when SQL generation itself fails.
/// Syntactically valid, returns zero rows, and trips no table errors.
pub const PLACEHOLDER_QUERY: &str = "SELECT NULL WHERE 1 = 0";

/// Chatter markers; a line containing one (case-insensitively) is dropped.
const FILLER_MARKERS: &[&str] = &["here is", "here's", "this query", "note:"];

// Every wrong spelling of the order line items table. Quoted forms are
// listed first so they are consumed whole and not re-wrapped.
static ORDER_DETAILS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)"order details"|'order details'|`order details`|\[order details\]|\border[_ ]?details\b"#,
    )
    .expect("valid regex")
});

/// Clean one raw SQL candidate: strip markdown fences, drop chatter lines,
/// and canonicalize the `"Order Details"` table name.
#[must_use]
pub fn clean_sql(raw: &str) -> String {
    let unfenced = raw.replace("```sql", "").replace("```", "");

    let kept: Vec<&str> = unfenced
        .lines()
        .filter(|line| {
            let folded = line.to_lowercase();
            !FILLER_MARKERS.iter().any(|m| folded.contains(m))
        })
        .collect();

    let joined = kept.join("\n");
    ORDER_DETAILS
        .replace_all(&joined, "\"Order Details\"")
        .trim()
        .to_string()
}

/// Augment a failure message with a concrete fix when it points at a wrong
/// form of the `"Order Details"` table name. Other messages pass through
/// unchanged.
#[must_use]
pub fn with_table_hint(last_error: &str) -> String {
    let folded = last_error.to_lowercase();
    let wrong_form = folded.contains("orderdetails")
        || folded.contains("order_details")
        || (folded.contains("no such table") && folded.contains("order"));
    if wrong_form {
        format!(
            "{last_error}\nHint: the order line items table must be written exactly as \"Order Details\" (double-quoted, with a space)."
        )
    } else {
        last_error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown_fences() {
        let raw = "```sql\nSELECT COUNT(*) FROM Orders\n```";
        assert_eq!(clean_sql(raw), "SELECT COUNT(*) FROM Orders");
    }

    #[test]
    fn test_drops_filler_lines() {
        let raw = "Here is the query you asked for:\nSELECT 1\nNote: adjust as needed";
        assert_eq!(clean_sql(raw), "SELECT 1");
    }

    #[test]
    fn test_canonicalizes_order_details_spellings() {
        for raw in [
            "SELECT * FROM OrderDetails",
            "SELECT * FROM Order_Details",
            "SELECT * FROM Order Details",
            "SELECT * FROM 'Order Details'",
            "SELECT * FROM `Order Details`",
            "SELECT * FROM [Order Details]",
            "SELECT * FROM order details",
        ] {
            assert_eq!(
                clean_sql(raw),
                "SELECT * FROM \"Order Details\"",
                "input: {raw}"
            );
        }
    }

    #[test]
    fn test_already_quoted_form_is_unchanged() {
        let raw = r#"SELECT SUM(Quantity) FROM "Order Details""#;
        assert_eq!(clean_sql(raw), raw);
    }

    #[test]
    fn test_clean_sql_combined() {
        let raw = "```sql\nHere is your query:\nSELECT ProductID FROM OrderDetails WHERE Quantity > 10\n```";
        assert_eq!(
            clean_sql(raw),
            "SELECT ProductID FROM \"Order Details\" WHERE Quantity > 10"
        );
    }

    #[test]
    fn test_hint_added_for_wrong_table_form() {
        let hinted = with_table_hint("no such table: OrderDetails");
        assert!(hinted.contains("no such table: OrderDetails"));
        assert!(hinted.contains("\"Order Details\""));
    }

    #[test]
    fn test_hint_not_added_for_unrelated_errors() {
        let msg = "no such column: Revenue";
        assert_eq!(with_table_hint(msg), msg);
    }

    #[test]
    fn test_placeholder_is_inert() {
        // Keep the placeholder free of table references so citation
        // scanning never picks anything up from it
        for table in analyst_db::DOMAIN_TABLES {
            assert!(!PLACEHOLDER_QUERY.contains(table));
        }
    }
}
