use thiserror::Error;

/// Result type for record operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by record persistence.
///
/// Connection and statement failures propagate from the backing store
/// untouched. No-op conditions (saving a clean record, updating a record
/// that was never persisted) are not errors; they come back as `Ok(false)`
/// or `Ok(true)` sentinels from the operation itself.
#[derive(Debug, Error)]
pub enum Error {
    /// Failure reported by the SQLite layer.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A dirty record cannot be updated without its key attribute.
    #[error("missing key attribute `{key}` on table `{table}`")]
    MissingKey {
        /// Table the record maps to.
        table: String,
        /// Name of the primary key column.
        key: String,
    },
}

impl Error {
    /// Creates a missing key error.
    pub fn missing_key(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingKey {
            table: table.into(),
            key: key.into(),
        }
    }
}
