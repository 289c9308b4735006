use thiserror::Error;

/// Errors that can occur within the reminder scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The lending ledger could not be read.
    #[error("Ledger error: {0}")]
    Ledger(#[from] libris_ledger::LedgerError),

    /// The configured time of day or offset is unusable.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// A blocking ledger task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
