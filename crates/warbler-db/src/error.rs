use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A NOT NULL, UNIQUE, FOREIGN KEY or CHECK constraint rejected a write.
    #[error("integrity error: {message}")]
    Integrity { message: String },

    #[error("database error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, StoreError::Integrity { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            StoreError::Integrity {
                message: err.to_string(),
            }
        } else {
            StoreError::Sqlite(err)
        }
    }
}
