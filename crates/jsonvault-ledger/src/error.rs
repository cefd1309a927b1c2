use jsonvault_store::StoreError;
use jsonvault_types::{EntryId, HistoryId};

/// Errors produced by entry and history operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Required input was missing or malformed.
    #[error("{0}")]
    Validation(String),

    #[error("Entry not found: {0}")]
    NotFound(EntryId),

    #[error("History record not found: {0}")]
    HistoryNotFound(HistoryId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
