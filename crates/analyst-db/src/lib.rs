//! Query Executor boundary for analyst
//!
//! Runs candidate SQL against the backing SQLite database. A failing
//! statement is not an `Err`: execution failures are data that feed the
//! engine's repair loop, so `execute` returns a `QueryOutcome` with the
//! error message inside. `DbError` is reserved for adapter failures
//! (opening the database, schema introspection).

use camino::Utf8Path;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

pub use analyst_utils::error::DbError;

/// The fixed set of domain tables.
///
/// Used as the default schema subset and by citation scanning. `Order
/// Details` contains a space and must always be double-quoted in SQL.
pub const DOMAIN_TABLES: &[&str] = &[
    "Orders",
    "Order Details",
    "Products",
    "Customers",
    "Categories",
    "Suppliers",
];

/// A successful tabular result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableResult {
    /// Column names in select order
    pub columns: Vec<String>,
    /// Row values; JSON values so integers, reals, text, blobs, and NULLs
    /// all render uniformly
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Outcome of executing one SQL statement: rows or a failure message,
/// mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// The statement executed; zero rows is still a success.
    Rows(TableResult),
    /// The statement failed; the message is what the repair loop feeds back
    /// to query generation.
    Failed { message: String },
}

impl QueryOutcome {
    /// Whether this outcome is a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, QueryOutcome::Failed { .. })
    }

    /// The failure message, if any.
    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            QueryOutcome::Failed { message } => Some(message),
            QueryOutcome::Rows(_) => None,
        }
    }
}

/// Query Executor boundary.
///
/// `schema` renders a textual description of the requested tables (or the
/// domain default set) for prompt context; `execute` runs one statement.
pub trait QueryExecutor: Send + Sync {
    /// Describe the schema of `tables` (default: [`DOMAIN_TABLES`]).
    ///
    /// # Errors
    ///
    /// Returns `DbError::Schema` if introspection itself fails. Tables
    /// missing from the database are skipped, not errors.
    fn schema(&self, tables: Option<&[String]>) -> Result<String, DbError>;

    /// Execute one SQL statement. Never returns `Err`; failures are carried
    /// in the outcome.
    fn execute(&self, sql: &str) -> QueryOutcome;
}

/// SQLite-backed executor.
///
/// The connection is wrapped in a mutex: one question's steps are strictly
/// sequential, but separate questions may run concurrently against a shared
/// executor.
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    /// Open the database file.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Open` if the file cannot be opened.
    pub fn open(path: &Utf8Path) -> Result<Self, DbError> {
        let conn = Connection::open(path).map_err(|e| DbError::Open {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (test fixtures).
    ///
    /// # Errors
    ///
    /// Returns `DbError::Open` if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().map_err(|e| DbError::Open {
            path: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run arbitrary setup statements (test fixtures).
    ///
    /// # Errors
    ///
    /// Returns `DbError::Schema` if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        let conn = self.conn.lock().expect("connection mutex poisoned");
        conn.execute_batch(sql)
            .map_err(|e| DbError::Schema(e.to_string()))
    }

    fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
        match value {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Integer(i) => serde_json::Value::from(i),
            ValueRef::Real(f) => {
                serde_json::Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            ValueRef::Text(t) => serde_json::Value::from(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => {
                // Blobs never appear in analytics answers; render a length tag
                serde_json::Value::from(format!("<blob {} bytes>", b.len()))
            }
        }
    }
}

impl QueryExecutor for SqliteExecutor {
    fn schema(&self, tables: Option<&[String]>) -> Result<String, DbError> {
        let conn = self.conn.lock().expect("connection mutex poisoned");

        let default_tables: Vec<String> = DOMAIN_TABLES.iter().map(|t| t.to_string()).collect();
        let tables = tables.unwrap_or(default_tables.as_slice());

        let mut blocks = Vec::new();
        for table in tables {
            let exists: bool = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get::<_, i64>(0),
                )
                .map(|n| n > 0)
                .map_err(|e| DbError::Schema(e.to_string()))?;
            if !exists {
                continue;
            }

            let mut stmt = conn
                .prepare(&format!("PRAGMA table_info('{}')", table.replace('\'', "''")))
                .map_err(|e| DbError::Schema(e.to_string()))?;
            let columns = stmt
                .query_map([], |row| {
                    let name: String = row.get(1)?;
                    let col_type: String = row.get(2)?;
                    Ok(format!("{name} {col_type}"))
                })
                .map_err(|e| DbError::Schema(e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| DbError::Schema(e.to_string()))?;

            blocks.push(format!("Table: {table}\nColumns: {}", columns.join(", ")));
        }

        Ok(blocks.join("\n\n"))
    }

    fn execute(&self, sql: &str) -> QueryOutcome {
        let conn = self.conn.lock().expect("connection mutex poisoned");

        let mut stmt = match conn.prepare(sql) {
            Ok(stmt) => stmt,
            Err(e) => {
                debug!(error = %e, "SQL prepare failed");
                return QueryOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mapped = stmt.query_map([], |row| {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(Self::value_to_json(row.get_ref(i)?));
            }
            Ok(values)
        });

        let rows = match mapped {
            Ok(iter) => match iter.collect::<Result<Vec<_>, _>>() {
                Ok(rows) => rows,
                Err(e) => {
                    debug!(error = %e, "SQL row read failed");
                    return QueryOutcome::Failed {
                        message: e.to_string(),
                    };
                }
            },
            Err(e) => {
                debug!(error = %e, "SQL execution failed");
                return QueryOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        QueryOutcome::Rows(TableResult { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SqliteExecutor {
        let db = SqliteExecutor::open_in_memory().unwrap();
        db.execute_batch(
            r#"
            CREATE TABLE Products (
                ProductID INTEGER PRIMARY KEY,
                ProductName TEXT,
                UnitPrice REAL
            );
            CREATE TABLE "Order Details" (
                OrderID INTEGER,
                ProductID INTEGER,
                Quantity INTEGER
            );
            INSERT INTO Products VALUES (1, 'Chai', 18.0), (2, 'Chang', 19.0);
            INSERT INTO "Order Details" VALUES (10248, 1, 12);
            "#,
        )
        .unwrap();
        db
    }

    #[test]
    fn test_execute_returns_columns_and_rows() {
        let db = fixture();
        let outcome = db.execute("SELECT ProductName, UnitPrice FROM Products ORDER BY ProductID");
        match outcome {
            QueryOutcome::Rows(result) => {
                assert_eq!(result.columns, vec!["ProductName", "UnitPrice"]);
                assert_eq!(result.rows.len(), 2);
                assert_eq!(result.rows[0][0], serde_json::json!("Chai"));
                assert_eq!(result.rows[0][1], serde_json::json!(18.0));
            }
            QueryOutcome::Failed { message } => panic!("unexpected failure: {message}"),
        }
    }

    #[test]
    fn test_execute_empty_result_is_success() {
        let db = fixture();
        let outcome = db.execute("SELECT * FROM Products WHERE UnitPrice > 100");
        match outcome {
            QueryOutcome::Rows(result) => assert!(result.rows.is_empty()),
            QueryOutcome::Failed { .. } => panic!("empty result must not be a failure"),
        }
    }

    #[test]
    fn test_execute_failure_carries_message() {
        let db = fixture();
        let outcome = db.execute("SELECT * FROM OrderDetails");
        assert!(outcome.is_failure());
        let message = outcome.failure_message().unwrap();
        assert!(message.contains("OrderDetails"), "got: {message}");
    }

    #[test]
    fn test_quoted_table_with_space_works() {
        let db = fixture();
        let outcome = db.execute(r#"SELECT Quantity FROM "Order Details""#);
        match outcome {
            QueryOutcome::Rows(result) => {
                assert_eq!(result.rows, vec![vec![serde_json::json!(12)]]);
            }
            QueryOutcome::Failed { message } => panic!("unexpected failure: {message}"),
        }
    }

    #[test]
    fn test_schema_lists_existing_tables_only() {
        let db = fixture();
        let schema = db.schema(None).unwrap();
        assert!(schema.contains("Table: Products"));
        assert!(schema.contains("ProductName TEXT"));
        assert!(schema.contains("Table: Order Details"));
        // Tables absent from the fixture are skipped silently
        assert!(!schema.contains("Table: Customers"));
    }

    #[test]
    fn test_schema_subset_request() {
        let db = fixture();
        let schema = db.schema(Some(&["Products".to_string()])).unwrap();
        assert!(schema.contains("Table: Products"));
        assert!(!schema.contains("Order Details"));
    }

    #[test]
    fn test_null_values_render_as_json_null() {
        let db = fixture();
        db.execute_batch("INSERT INTO Products (ProductID) VALUES (3);")
            .unwrap();
        let outcome = db.execute("SELECT ProductName FROM Products WHERE ProductID = 3");
        match outcome {
            QueryOutcome::Rows(result) => {
                assert_eq!(result.rows[0][0], serde_json::Value::Null);
            }
            QueryOutcome::Failed { message } => panic!("unexpected failure: {message}"),
        }
    }
}
