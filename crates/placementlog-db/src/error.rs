use rusqlite::ffi;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique or primary-key constraint rejected the write.
    #[error("already exists: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Backend(#[source] rusqlite::Error),

    #[error("database lock poisoned: {0}")]
    Poisoned(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, msg) = &err {
            if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                return Self::Conflict(msg.clone().unwrap_or_else(|| code.to_string()));
            }
        }
        Self::Backend(err)
    }
}
