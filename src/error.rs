//! Error types for the scheduling engine and the item store.
use thiserror::Error;

/// Errors raised by the pure scheduling functions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// Prior item state violates a scheduling invariant (corrupted data).
    #[error("invalid review state for item {item_id}: {reason}")]
    InvalidState { item_id: i64, reason: String },

    /// A valid item whose next interval no longer fits the calendar.
    #[error("next interval of {interval_days} days for item {item_id} is out of range")]
    ScheduleOverflow { item_id: i64, interval_days: u64 },
}

/// Errors raised by the SQLite item store and the layers built on it.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("item {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("invalid item content: {0}")]
    Validation(String),

    #[error("item {0} was modified by a concurrent review")]
    Conflict(i64),

    #[error("failed to acquire connection lock: {0}")]
    LockError(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
