//! Shared test helpers for license tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cchub_license::{LicenseMessage, NotificationDispatcher, Notifier, NotifyError};
use cchub_store::{
    DeviceAppend, LicenseStore, SqliteStore, StorageError, StorageResult, TransactionInsert,
    UniqueField,
};
use cchub_types::{
    Email, Identity, IdentityId, License, LicenseId, LicenseStatus, NewLicense, NewTransaction,
    NewVersion, Transaction, Version, VersionId,
};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// A [`SqliteStore`] with switchable faults.
#[derive(Default)]
pub struct FaultyStore {
    inner: Option<SqliteStore>,
    /// Upcoming `license_key_exists` calls that answer "taken".
    pub taken_key_checks: AtomicU32,
    /// Upcoming `insert_license` calls that fail on the key index.
    pub key_conflicts_on_insert: AtomicU32,
    pub fail_touch: AtomicBool,
    pub fail_versions: AtomicBool,
    pub fail_license_lookup: AtomicBool,
    pub fail_identity_create: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: Some(SqliteStore::open_in_memory().unwrap()),
            ..Default::default()
        }
    }

    fn inner(&self) -> &SqliteStore {
        self.inner.as_ref().unwrap()
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn injected() -> StorageError {
        StorageError::InvalidData("injected fault".into())
    }
}

impl LicenseStore for FaultyStore {
    fn find_identity_by_email(&self, email: &Email) -> StorageResult<Option<Identity>> {
        self.inner().find_identity_by_email(email)
    }

    fn find_identity(&self, id: IdentityId) -> StorageResult<Option<Identity>> {
        self.inner().find_identity(id)
    }

    fn find_or_create_identity(&self, email: &Email, name: &str) -> StorageResult<Identity> {
        if self.fail_identity_create.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner().find_or_create_identity(email, name)
    }

    fn license_key_exists(&self, key: &str) -> StorageResult<bool> {
        if Self::take(&self.taken_key_checks) {
            return Ok(true);
        }
        self.inner().license_key_exists(key)
    }

    fn insert_license(&self, license: &NewLicense) -> StorageResult<License> {
        if Self::take(&self.key_conflicts_on_insert) {
            return Err(StorageError::UniqueViolation(UniqueField::LicenseKey));
        }
        self.inner().insert_license(license)
    }

    fn find_license_by_key(&self, key: &str) -> StorageResult<Option<License>> {
        if self.fail_license_lookup.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner().find_license_by_key(key)
    }

    fn licenses_for_identity(&self, owner: IdentityId) -> StorageResult<Vec<License>> {
        self.inner().licenses_for_identity(owner)
    }

    fn append_device(&self, license: LicenseId, device_id: &str) -> StorageResult<DeviceAppend> {
        self.inner().append_device(license, device_id)
    }

    fn touch_last_checked(&self, license: LicenseId, at: DateTime<Utc>) -> StorageResult<()> {
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner().touch_last_checked(license, at)
    }

    fn find_transaction(&self, processor_id: &str) -> StorageResult<Option<Transaction>> {
        self.inner().find_transaction(processor_id)
    }

    fn insert_transaction(&self, tx: &NewTransaction) -> StorageResult<TransactionInsert> {
        self.inner().insert_transaction(tx)
    }

    fn insert_version(&self, version: &NewVersion) -> StorageResult<Version> {
        self.inner().insert_version(version)
    }

    fn set_version_published(&self, id: VersionId, published: bool) -> StorageResult<()> {
        self.inner().set_version_published(id, published)
    }

    fn latest_published_version_above(&self, build: i64) -> StorageResult<Option<Version>> {
        if self.fail_versions.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner().latest_published_version_above(build)
    }
}

/// Inserts a license with a fixed key for `email`.
pub fn seed_license(
    store: &dyn LicenseStore,
    email: &str,
    key: &str,
    limit: u32,
    status: LicenseStatus,
) -> License {
    let owner = store
        .find_or_create_identity(&Email::parse(email).unwrap(), "Seeded Owner")
        .unwrap();
    store
        .insert_license(&NewLicense {
            key: key.to_string(),
            key_salt: format!("salt-{key}"),
            owner: owner.id,
            status,
            tier: "pro".to_string(),
            activation_limit: limit,
            purchase: None,
        })
        .unwrap()
}

pub fn seed_version(store: &dyn LicenseStore, build: i64, min_required: i64) -> Version {
    store
        .insert_version(&NewVersion {
            build_number: build,
            version_string: format!("1.0.{build}"),
            release_notes: format!("Changes in build {build}"),
            artifact: format!("CursorClip-{build}.dmg"),
            signature_eddsa: format!("sig-{build}"),
            is_published: true,
            min_required_build: min_required,
        })
        .unwrap()
}

/// Notifier that forwards every message to a channel.
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<LicenseMessage>,
}

impl RecordingNotifier {
    pub fn dispatcher() -> (NotificationDispatcher, mpsc::UnboundedReceiver<LicenseMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (NotificationDispatcher::new(Arc::new(Self { tx })), rx)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, message: &LicenseMessage) -> Result<(), NotifyError> {
        self.tx
            .send(message.clone())
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

/// Notifier that always fails.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    fn name(&self) -> &str {
        "failing"
    }

    async fn send(&self, _message: &LicenseMessage) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected(503))
    }
}

/// Waits briefly for the next delivered message.
pub async fn next_message(
    rx: &mut mpsc::UnboundedReceiver<LicenseMessage>,
) -> Option<LicenseMessage> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .ok()
        .flatten()
}

/// Asserts nothing is delivered within a short window.
pub async fn assert_no_message(rx: &mut mpsc::UnboundedReceiver<LicenseMessage>) {
    let got = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(!matches!(got, Ok(Some(_))), "unexpected license mail: {got:?}");
}
