use rusqlite::{ffi, ErrorCode};

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database could not be opened or a connection could not be made.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A unique or primary key constraint rejected the write.
    #[error("duplicate key: {0}")]
    Conflict(String),

    /// A foreign key constraint rejected the write (dangling reference).
    #[error("referenced row not found: {0}")]
    Constraint(String),

    /// A persisted row could not be decoded.
    #[error("corrupt row {table}#{id}: {reason}")]
    CorruptRow {
        table: &'static str,
        id: i64,
        reason: String,
    },

    /// A document could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other SQLite failure.
    #[error("sqlite error: {0}")]
    Sql(rusqlite::Error),

    /// I/O error while preparing the storage location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &err {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::Conflict(detail);
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::Constraint(detail),
                _ => {}
            }
            if matches!(
                failure.code,
                ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::PermissionDenied
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
            ) {
                return Self::Unavailable(detail);
            }
        }
        Self::Sql(err)
    }
}

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
