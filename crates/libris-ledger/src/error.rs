use thiserror::Error;

/// Errors raised while reading the lending ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The database file could not be opened.
    #[error("cannot open ledger at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
