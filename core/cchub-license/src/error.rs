//! Error types for the licensing module.

use cchub_store::StorageError;
use thiserror::Error;

/// Licensing-specific errors.
///
/// Business outcomes (limit reached, license not active, duplicate purchase)
/// are not represented here.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Malformed or missing request field.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No unused key was found within the attempt budget.
    #[error("failed to generate a unique license key after {0} attempts")]
    ExhaustedRetries(u32),

    /// Startup configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
