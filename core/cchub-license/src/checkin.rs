//! Periodic client check-in.
//!
//! A check-in answers two independent questions: is this device licensed,
//! and is there a newer build. Each half is resolved on its own and both
//! are always present in the report, whatever happened to the other.

use std::sync::Arc;

use cchub_store::LicenseStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::key::normalize_key;
use crate::update::{UpdateInfo, UpdateResolver};

/// Activation verdict for the checking-in device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckinStatus {
    /// No key supplied.
    Free,
    /// Key is active and this device holds a slot.
    Active,
    /// Unknown key, revoked license, or device not activated.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationState {
    pub status: CheckinStatus,
    pub tier: String,
}

impl ActivationState {
    #[must_use]
    pub fn free() -> Self {
        Self {
            status: CheckinStatus::Free,
            tier: "free".to_string(),
        }
    }

    #[must_use]
    pub fn invalid() -> Self {
        Self {
            status: CheckinStatus::Invalid,
            tier: "invalid".to_string(),
        }
    }

    #[must_use]
    pub fn active(tier: impl Into<String>) -> Self {
        Self {
            status: CheckinStatus::Active,
            tier: tier.into(),
        }
    }
}

/// Merged check-in answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinReport {
    pub activation: ActivationState,
    pub update: Option<UpdateInfo>,
}

/// Serves client check-ins.
pub struct CheckinService {
    store: Arc<dyn LicenseStore>,
    updates: UpdateResolver,
}

impl CheckinService {
    pub fn new(store: Arc<dyn LicenseStore>, updates: UpdateResolver) -> Self {
        Self { store, updates }
    }

    /// Evaluates activation and update status. Never fails: storage errors
    /// degrade the affected half (`invalid` activation, no update) and are
    /// logged.
    pub fn checkin(&self, key: Option<&str>, device_id: &str, current_build: i64) -> CheckinReport {
        let activation = self.activation_state(key, device_id);
        let update = match self.updates.resolve(current_build) {
            Ok(update) => update,
            Err(e) => {
                warn!(current_build, error = %e, "update lookup failed during check-in");
                None
            }
        };
        CheckinReport { activation, update }
    }

    fn activation_state(&self, key: Option<&str>, device_id: &str) -> ActivationState {
        let Some(key) = key.map(normalize_key).filter(|k| !k.is_empty()) else {
            return ActivationState::free();
        };
        let license = match self.store.find_license_by_key(&key) {
            Ok(Some(license)) => license,
            Ok(None) => return ActivationState::invalid(),
            Err(e) => {
                warn!(error = %e, "license lookup failed during check-in");
                return ActivationState::invalid();
            }
        };
        if !license.is_active() || !license.has_device(device_id.trim()) {
            debug!(license = %license.id, "check-in from unlicensed device");
            return ActivationState::invalid();
        }

        if let Err(e) = self.store.touch_last_checked(license.id, Utc::now()) {
            warn!(license = %license.id, error = %e, "failed to record check-in time");
        }
        ActivationState::active(license.tier)
    }
}
