use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown history action: {0}")]
    UnknownAction(String),

    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
}
