//! SQLite-backed [`LicenseStore`].

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cchub_types::{
    Email, Identity, IdentityId, License, LicenseId, LicenseStatus, NewLicense, NewTransaction,
    NewVersion, Processor, Transaction, TransactionId, Version, VersionId,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use crate::schema::SCHEMA;
use crate::store::{DeviceAppend, LicenseStore, TransactionInsert};
use crate::{StorageError, StorageResult, UniqueField};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const LICENSE_COLUMNS: &str = "id, key, key_salt, owner_id, status, tier, activation_limit, \
     purchase_id, last_checked_at, created_at";

const VERSION_COLUMNS: &str = "id, build_number, version_string, release_notes, artifact, \
     signature_eddsa, is_published, min_required_build, published_at, created_at";

/// Record store backed by a single SQLite connection.
///
/// Cloning shares the connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        debug!(path = %path.display(), "opened license store");
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl LicenseStore for SqliteStore {
    // ── Identities ───────────────────────────────────────────────

    fn find_identity_by_email(&self, email: &Email) -> StorageResult<Option<Identity>> {
        let conn = self.lock()?;
        identity_where(&conn, "email = ?1", email.as_str())
    }

    fn find_identity(&self, id: IdentityId) -> StorageResult<Option<Identity>> {
        let conn = self.lock()?;
        identity_where(&conn, "id = ?1", &id.to_string())
    }

    fn find_or_create_identity(&self, email: &Email, name: &str) -> StorageResult<Identity> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO identities (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (email) DO NOTHING",
            params![
                IdentityId::new().to_string(),
                email.as_str(),
                name,
                timestamp(Utc::now())
            ],
        )?;
        if inserted == 1 {
            debug!(email = %email, "created identity");
        }
        identity_where(&conn, "email = ?1", email.as_str())?
            .ok_or_else(|| StorageError::NotFound(format!("identity {email}")))
    }

    // ── Licenses ─────────────────────────────────────────────────

    fn license_key_exists(&self, key: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row("SELECT 1 FROM licenses WHERE key = ?1", params![key], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_license(&self, license: &NewLicense) -> StorageResult<License> {
        let conn = self.lock()?;
        let id = LicenseId::new();
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO licenses (id, key, key_salt, owner_id, status, tier, activation_limit,
                                   purchase_id, last_checked_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9)",
            params![
                id.to_string(),
                license.key,
                license.key_salt,
                license.owner.to_string(),
                license.status.as_str(),
                license.tier,
                i64::from(license.activation_limit),
                license.purchase.map(|p| p.to_string()),
                timestamp(created_at),
            ],
        )?;
        Ok(License {
            id,
            key: license.key.clone(),
            key_salt: license.key_salt.clone(),
            owner: license.owner,
            status: license.status,
            tier: license.tier.clone(),
            activation_limit: license.activation_limit,
            activated_devices: Vec::new(),
            purchase: license.purchase,
            last_checked_at: None,
            created_at: parse_timestamp(&timestamp(created_at))?,
        })
    }

    fn find_license_by_key(&self, key: &str) -> StorageResult<Option<License>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE key = ?1"),
                params![key],
                LicenseRow::from_row,
            )
            .optional()?;
        row.map(|r| r.into_license(&conn)).transpose()
    }

    fn licenses_for_identity(&self, owner: IdentityId) -> StorageResult<Vec<License>> {
        let conn = self.lock()?;
        let rows = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LICENSE_COLUMNS} FROM licenses WHERE owner_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;
            stmt.query_map(params![owner.to_string()], LicenseRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?
        };
        rows.into_iter().map(|r| r.into_license(&conn)).collect()
    }

    fn append_device(&self, license: LicenseId, device_id: &str) -> StorageResult<DeviceAppend> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let license_id = license.to_string();

        let appended = tx.execute(
            "INSERT INTO license_devices (license_id, device_id, activated_at)
             SELECT ?1, ?2, ?3
             WHERE NOT EXISTS (
                     SELECT 1 FROM license_devices WHERE license_id = ?1 AND device_id = ?2)
               AND (SELECT COUNT(*) FROM license_devices WHERE license_id = ?1)
                   < (SELECT activation_limit FROM licenses WHERE id = ?1)",
            params![license_id, device_id, timestamp(Utc::now())],
        )?;

        let outcome = if appended == 1 {
            DeviceAppend::Appended
        } else {
            let present = tx
                .query_row(
                    "SELECT 1 FROM license_devices WHERE license_id = ?1 AND device_id = ?2",
                    params![license_id, device_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if present {
                DeviceAppend::AlreadyPresent
            } else {
                let exists = tx
                    .query_row("SELECT 1 FROM licenses WHERE id = ?1", params![license_id], |_| {
                        Ok(())
                    })
                    .optional()?
                    .is_some();
                if !exists {
                    return Err(StorageError::NotFound(format!("license {license_id}")));
                }
                DeviceAppend::Full
            }
        };
        tx.commit()?;
        Ok(outcome)
    }

    fn touch_last_checked(&self, license: LicenseId, at: DateTime<Utc>) -> StorageResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE licenses SET last_checked_at = ?2 WHERE id = ?1",
            params![license.to_string(), timestamp(at)],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("license {license}")));
        }
        Ok(())
    }

    // ── Transactions ─────────────────────────────────────────────

    fn find_transaction(&self, processor_id: &str) -> StorageResult<Option<Transaction>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, processor, processor_id, buyer_email, buyer_name, payload, created_at
                 FROM transactions WHERE processor_id = ?1",
                params![processor_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, processor, processor_id, email, name, payload, created_at)| {
            Ok(Transaction {
                id: TransactionId::parse(&id).map_err(invalid)?,
                processor: processor.parse::<Processor>().map_err(invalid)?,
                processor_id,
                buyer_email: Email::parse(&email).map_err(invalid)?,
                buyer_name: name,
                payload: serde_json::from_str(&payload)?,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    fn insert_transaction(&self, tx: &NewTransaction) -> StorageResult<TransactionInsert> {
        let conn = self.lock()?;
        let id = TransactionId::new();
        let created_at = timestamp(Utc::now());
        let result = conn.execute(
            "INSERT INTO transactions (id, processor, processor_id, buyer_email, buyer_name,
                                       payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                tx.processor.as_str(),
                tx.processor_id,
                tx.buyer_email.as_str(),
                tx.buyer_name,
                serde_json::to_string(&tx.payload)?,
                created_at,
            ],
        );
        match result.map_err(StorageError::from) {
            Ok(_) => Ok(TransactionInsert::Inserted(Transaction {
                id,
                processor: tx.processor,
                processor_id: tx.processor_id.clone(),
                buyer_email: tx.buyer_email.clone(),
                buyer_name: tx.buyer_name.clone(),
                payload: tx.payload.clone(),
                created_at: parse_timestamp(&created_at)?,
            })),
            Err(StorageError::UniqueViolation(UniqueField::ProcessorId)) => {
                debug!(processor_id = %tx.processor_id, "transaction already recorded");
                Ok(TransactionInsert::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    // ── Versions ─────────────────────────────────────────────────

    fn insert_version(&self, version: &NewVersion) -> StorageResult<Version> {
        let conn = self.lock()?;
        let id = VersionId::new();
        let now = timestamp(Utc::now());
        let published_at = version.is_published.then(|| now.clone());
        conn.execute(
            "INSERT INTO versions (id, build_number, version_string, release_notes, artifact,
                                   signature_eddsa, is_published, min_required_build,
                                   published_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id.to_string(),
                version.build_number,
                version.version_string,
                version.release_notes,
                version.artifact,
                version.signature_eddsa,
                version.is_published,
                version.min_required_build,
                published_at,
                now,
            ],
        )?;
        version_where(&conn, "id = ?1", &id.to_string())?
            .ok_or_else(|| StorageError::NotFound(format!("version {id}")))
    }

    fn set_version_published(&self, id: VersionId, published: bool) -> StorageResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE versions
             SET is_published = ?2,
                 published_at = CASE WHEN ?2 THEN COALESCE(published_at, ?3) ELSE published_at END
             WHERE id = ?1",
            params![id.to_string(), published, timestamp(Utc::now())],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("version {id}")));
        }
        Ok(())
    }

    fn latest_published_version_above(&self, build: i64) -> StorageResult<Option<Version>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {VERSION_COLUMNS} FROM versions
                     WHERE is_published = 1 AND build_number > ?1
                     ORDER BY build_number DESC LIMIT 1"
                ),
                params![build],
                VersionRow::from_row,
            )
            .optional()?;
        row.map(VersionRow::into_version).transpose()
    }
}

// ── Row decoding ─────────────────────────────────────────────────

struct LicenseRow {
    id: String,
    key: String,
    key_salt: String,
    owner: String,
    status: String,
    tier: String,
    activation_limit: i64,
    purchase: Option<String>,
    last_checked_at: Option<String>,
    created_at: String,
}

impl LicenseRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            key: row.get(1)?,
            key_salt: row.get(2)?,
            owner: row.get(3)?,
            status: row.get(4)?,
            tier: row.get(5)?,
            activation_limit: row.get(6)?,
            purchase: row.get(7)?,
            last_checked_at: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_license(self, conn: &Connection) -> StorageResult<License> {
        let activated_devices = {
            let mut stmt = conn.prepare(
                "SELECT device_id FROM license_devices WHERE license_id = ?1 ORDER BY seq",
            )?;
            stmt.query_map(params![self.id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(License {
            id: LicenseId::parse(&self.id).map_err(invalid)?,
            key: self.key,
            key_salt: self.key_salt,
            owner: IdentityId::parse(&self.owner).map_err(invalid)?,
            status: self.status.parse::<LicenseStatus>().map_err(invalid)?,
            tier: self.tier,
            activation_limit: u32::try_from(self.activation_limit).map_err(invalid)?,
            activated_devices,
            purchase: self
                .purchase
                .as_deref()
                .map(TransactionId::parse)
                .transpose()
                .map_err(invalid)?,
            last_checked_at: self.last_checked_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct VersionRow {
    id: String,
    build_number: i64,
    version_string: String,
    release_notes: String,
    artifact: String,
    signature_eddsa: String,
    is_published: bool,
    min_required_build: i64,
    published_at: Option<String>,
    created_at: String,
}

impl VersionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            build_number: row.get(1)?,
            version_string: row.get(2)?,
            release_notes: row.get(3)?,
            artifact: row.get(4)?,
            signature_eddsa: row.get(5)?,
            is_published: row.get(6)?,
            min_required_build: row.get(7)?,
            published_at: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_version(self) -> StorageResult<Version> {
        Ok(Version {
            id: VersionId::parse(&self.id).map_err(invalid)?,
            build_number: self.build_number,
            version_string: self.version_string,
            release_notes: self.release_notes,
            artifact: self.artifact,
            signature_eddsa: self.signature_eddsa,
            is_published: self.is_published,
            min_required_build: self.min_required_build,
            published_at: self.published_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn identity_where(conn: &Connection, filter: &str, value: &str) -> StorageResult<Option<Identity>> {
    let row = conn
        .query_row(
            &format!("SELECT id, email, name, created_at FROM identities WHERE {filter}"),
            params![value],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;
    row.map(|(id, email, name, created_at)| {
        Ok(Identity {
            id: IdentityId::parse(&id).map_err(invalid)?,
            email: Email::parse(&email).map_err(invalid)?,
            name,
            created_at: parse_timestamp(&created_at)?,
        })
    })
    .transpose()
}

fn version_where(conn: &Connection, filter: &str, value: &str) -> StorageResult<Option<Version>> {
    conn.query_row(
        &format!("SELECT {VERSION_COLUMNS} FROM versions WHERE {filter}"),
        params![value],
        VersionRow::from_row,
    )
    .optional()?
    .map(VersionRow::into_version)
    .transpose()
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(invalid)
}

fn invalid(err: impl std::fmt::Display) -> StorageError {
    StorageError::InvalidData(err.to_string())
}
