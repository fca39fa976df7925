//! Record store for the CursorClip license hub.
//!
//! The licensing logic talks to persistence only through [`LicenseStore`].
//! The store owns the two invariants that must not rely on application-level
//! check-then-act:
//!
//! - device admission is a single conditional insert ([`LicenseStore::append_device`])
//! - purchase dedup is the unique index on `processor_id`
//!   ([`LicenseStore::insert_transaction`])
//!
//! [`SqliteStore`] is the production implementation. It keeps one connection
//! behind a mutex, so every operation is serialized within the process.

mod error;
mod schema;
mod sqlite;
mod store;

pub use error::{StorageError, StorageResult, UniqueField};
pub use sqlite::SqliteStore;
pub use store::{DeviceAppend, LicenseStore, TransactionInsert};
