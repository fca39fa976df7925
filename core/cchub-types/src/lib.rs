//! Core type definitions for the CursorClip license hub.
//!
//! This crate defines the plain data shared by the store, the licensing
//! logic and the HTTP surface:
//! - Record identifiers (UUID v7)
//! - Normalized buyer e-mail addresses
//! - Identity, License, Transaction and Version records
//!
//! Nothing here touches storage or the network.

mod email;
mod ids;
mod record;

pub use email::Email;
pub use ids::{IdentityId, LicenseId, TransactionId, VersionId};
pub use record::{
    Identity, License, LicenseStatus, NewLicense, NewTransaction, NewVersion, Processor,
    Transaction, Version,
};

/// Errors that can occur while building or parsing records.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error("unknown license status: {0}")]
    UnknownStatus(String),

    #[error("unknown payment processor: {0}")]
    UnknownProcessor(String),
}
