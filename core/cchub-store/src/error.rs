//! Error types for the storage layer.

use std::fmt;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Unique column whose constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    LicenseKey,
    LicenseSalt,
    ProcessorId,
    BuildNumber,
    Email,
    Other,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LicenseKey => "licenses.key",
            Self::LicenseSalt => "licenses.key_salt",
            Self::ProcessorId => "transactions.processor_id",
            Self::BuildNumber => "versions.build_number",
            Self::Email => "identities.email",
            Self::Other => "unknown column",
        })
    }
}

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    /// A unique constraint rejected the write.
    #[error("unique constraint violated on {0}")]
    UniqueViolation(UniqueField),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record not found where one was required.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A stored row could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection mutex was poisoned by a panicking holder.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match unique_violation(&err) {
            Some(field) => Self::UniqueViolation(field),
            None => Self::Database(err),
        }
    }
}

/// Classifies a SQLite UNIQUE failure by the column named in its message
/// ("UNIQUE constraint failed: licenses.key").
fn unique_violation(err: &rusqlite::Error) -> Option<UniqueField> {
    let rusqlite::Error::SqliteFailure(code, msg) = err else {
        return None;
    };
    if code.extended_code != rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
        return None;
    }
    let column = msg
        .as_deref()
        .and_then(|m| m.rsplit(": ").next())
        .unwrap_or_default();
    Some(match column {
        "licenses.key" => UniqueField::LicenseKey,
        "licenses.key_salt" => UniqueField::LicenseSalt,
        "transactions.processor_id" => UniqueField::ProcessorId,
        "versions.build_number" => UniqueField::BuildNumber,
        "identities.email" => UniqueField::Email,
        _ => UniqueField::Other,
    })
}
