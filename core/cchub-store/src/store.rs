//! The record-store interface consumed by the licensing logic.

use cchub_types::{
    Email, Identity, IdentityId, License, LicenseId, NewLicense, NewTransaction, NewVersion,
    Transaction, Version, VersionId,
};
use chrono::{DateTime, Utc};

use crate::StorageResult;

/// Outcome of a conditional device append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAppend {
    /// The device already held a slot; nothing was written.
    AlreadyPresent,
    /// The device took a free slot.
    Appended,
    /// Every slot is taken; nothing was written.
    Full,
}

/// Outcome of recording a purchase transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionInsert {
    /// First delivery: the row was created.
    Inserted(Transaction),
    /// The `processor_id` was already recorded; nothing was written.
    Duplicate,
}

/// Persistent record store.
///
/// Implementations must enforce uniqueness of license keys, license salts,
/// processor ids and build numbers at the storage level, and must execute
/// [`append_device`](Self::append_device) atomically per license.
pub trait LicenseStore: Send + Sync {
    // ── Identities ───────────────────────────────────────────────

    /// Looks up an identity by canonical e-mail.
    fn find_identity_by_email(&self, email: &Email) -> StorageResult<Option<Identity>>;

    /// Looks up an identity by id.
    fn find_identity(&self, id: IdentityId) -> StorageResult<Option<Identity>>;

    /// Returns the identity for `email`, creating it with `name` if absent.
    /// An existing identity keeps its stored name.
    fn find_or_create_identity(&self, email: &Email, name: &str) -> StorageResult<Identity>;

    // ── Licenses ─────────────────────────────────────────────────

    /// Point lookup: does any license use `key`?
    fn license_key_exists(&self, key: &str) -> StorageResult<bool>;

    /// Inserts a license. Fails with
    /// [`StorageError::UniqueViolation`](crate::StorageError::UniqueViolation)
    /// if the key or salt is taken.
    fn insert_license(&self, license: &NewLicense) -> StorageResult<License>;

    /// Looks up a license by its exact key.
    fn find_license_by_key(&self, key: &str) -> StorageResult<Option<License>>;

    /// All licenses owned by an identity, newest first.
    fn licenses_for_identity(&self, owner: IdentityId) -> StorageResult<Vec<License>>;

    /// Appends `device_id` to the license iff it is absent and a slot is
    /// free, as one atomic step.
    fn append_device(&self, license: LicenseId, device_id: &str) -> StorageResult<DeviceAppend>;

    /// Records a successful check-in time.
    fn touch_last_checked(&self, license: LicenseId, at: DateTime<Utc>) -> StorageResult<()>;

    // ── Transactions ─────────────────────────────────────────────

    /// Looks up a transaction by the processor's idempotency key.
    fn find_transaction(&self, processor_id: &str) -> StorageResult<Option<Transaction>>;

    /// Records a transaction. A repeated `processor_id` yields
    /// [`TransactionInsert::Duplicate`], not an error.
    fn insert_transaction(&self, tx: &NewTransaction) -> StorageResult<TransactionInsert>;

    // ── Versions ─────────────────────────────────────────────────

    /// Inserts a release record.
    fn insert_version(&self, version: &NewVersion) -> StorageResult<Version>;

    /// Toggles the publish gate of a release.
    fn set_version_published(&self, id: VersionId, published: bool) -> StorageResult<()>;

    /// Highest published release with `build_number > build`.
    fn latest_published_version_above(&self, build: i64) -> StorageResult<Option<Version>>;
}
