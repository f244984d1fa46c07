//! Error types for the coach subsystem.

use thiserror::Error;

use crate::coach::core::topic::TopicError;

/// Coach subsystem error type.
///
/// Covers configuration and storage. Gateway failures have their own type
/// and never leave the orchestrator.
#[derive(Debug, Error)]
pub enum CoachError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Invalid topic identifier.
    #[error("invalid topic: {0}")]
    InvalidTopic(#[from] TopicError),
    /// Invalid record read back from storage.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Food ledger rejected or lost a write.
    #[error("food ledger error: {0}")]
    Ledger(String),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for coach operations.
pub type CoachResult<T> = Result<T, CoachError>;
