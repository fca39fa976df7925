//! Persisted records: identities, licenses, purchase transactions and
//! release versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Email, Error, IdentityId, LicenseId, TransactionId, VersionId};

/// A buyer. Created lazily on first purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    /// Canonical address; unique across identities.
    pub email: Email,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Active,
    Revoked,
}

impl LicenseStatus {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "revoked" => Ok(Self::Revoked),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}

/// An issued license.
///
/// `activated_devices` keeps insertion order, holds distinct values and
/// never grows past `activation_limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub id: LicenseId,
    pub key: String,
    pub key_salt: String,
    pub owner: IdentityId,
    pub status: LicenseStatus,
    pub tier: String,
    pub activation_limit: u32,
    pub activated_devices: Vec<String>,
    /// Transaction that minted this license, if any.
    pub purchase: Option<TransactionId>,
    /// Last successful check-in. Advisory only.
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl License {
    /// Returns true if the license status is `active`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == LicenseStatus::Active
    }

    /// Returns true if `device_id` already holds an activation slot.
    #[must_use]
    pub fn has_device(&self, device_id: &str) -> bool {
        self.activated_devices.iter().any(|d| d == device_id)
    }

    /// Number of activation slots still free.
    #[must_use]
    pub fn free_slots(&self) -> u32 {
        let used = u32::try_from(self.activated_devices.len()).unwrap_or(u32::MAX);
        self.activation_limit.saturating_sub(used)
    }
}

/// Insert form of a [`License`]. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLicense {
    pub key: String,
    pub key_salt: String,
    pub owner: IdentityId,
    pub status: LicenseStatus,
    pub tier: String,
    pub activation_limit: u32,
    pub purchase: Option<TransactionId>,
}

/// Payment processor that delivered a purchase notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Processor {
    Dodo,
    Stripe,
}

impl Processor {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dodo => "dodo",
            Self::Stripe => "stripe",
        }
    }
}

impl fmt::Display for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Processor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dodo" => Ok(Self::Dodo),
            "stripe" => Ok(Self::Stripe),
            other => Err(Error::UnknownProcessor(other.to_string())),
        }
    }
}

/// A recorded purchase notification. Append-only; the unique
/// `processor_id` is the idempotency marker for purchase processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub processor: Processor,
    pub processor_id: String,
    pub buyer_email: Email,
    pub buyer_name: String,
    /// Raw webhook body, kept verbatim for audit.
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Insert form of a [`Transaction`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub processor: Processor,
    pub processor_id: String,
    pub buyer_email: Email,
    pub buyer_name: String,
    pub payload: serde_json::Value,
}

/// A release build of the desktop application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    /// Monotonically increasing, unique.
    pub build_number: i64,
    pub version_string: String,
    pub release_notes: String,
    /// Stored file name of the downloadable artifact.
    pub artifact: String,
    /// Detached EdDSA signature of the artifact.
    pub signature_eddsa: String,
    pub is_published: bool,
    /// Oldest build allowed to keep running; 0 disables the floor.
    pub min_required_build: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Version {
    /// Returns true if a client on `current_build` must upgrade to this
    /// release before continuing.
    #[must_use]
    pub fn forces_upgrade_from(&self, current_build: i64) -> bool {
        self.min_required_build > 0 && current_build < self.min_required_build
    }
}

/// Insert form of a [`Version`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    pub build_number: i64,
    pub version_string: String,
    pub release_notes: String,
    pub artifact: String,
    pub signature_eddsa: String,
    pub is_published: bool,
    pub min_required_build: i64,
}
