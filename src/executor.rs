use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value::Value;

/// Blocking prepared-statement capability the persistence layer runs on.
///
/// This is the only seam between record logic and the backing store: one
/// parameterized statement per call, plus access to the connection's last
/// inserted row id for incrementing keys.
pub trait Executor {
    /// Prepare `sql`, bind each value by 1-based position, and execute.
    ///
    /// Returns `Ok(true)` when the statement ran; connection and statement
    /// failures propagate as errors.
    fn execute(&self, sql: &str, bindings: &[Value]) -> Result<bool>;

    /// Row id generated by the most recent successful insert.
    fn last_insert_id(&self) -> Result<i64>;
}

impl Executor for Connection {
    fn execute(&self, sql: &str, bindings: &[Value]) -> Result<bool> {
        tracing::trace!(sql, params = bindings.len(), "executing statement");
        let mut statement = self.prepare(sql)?;
        for (index, value) in bindings.iter().enumerate() {
            statement.raw_bind_parameter(index + 1, value)?;
        }
        statement.raw_execute()?;
        Ok(true)
    }

    fn last_insert_id(&self) -> Result<i64> {
        Ok(self.last_insert_rowid())
    }
}

/// SQLite connection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub path: String,
}

impl SqliteConfig {
    /// Create a config pointing at a database file.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Config for a private in-memory database.
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    /// Read the database path from `SQLITE_RECORD_DB`, in-memory when unset.
    pub fn from_env() -> Self {
        match std::env::var("SQLITE_RECORD_DB") {
            Ok(path) if !path.is_empty() => Self::new(path),
            _ => Self::in_memory(),
        }
    }

    /// Open a fresh connection handle. No pooling; callers own the handle.
    pub fn open(&self) -> Result<Connection> {
        tracing::debug!(path = %self.path, "opening sqlite database");
        Ok(Connection::open(&self.path)?)
    }
}
