//! Device activation against a license's slot budget.

use std::sync::Arc;

use cchub_store::{DeviceAppend, LicenseStore};
use cchub_types::{Email, License};
use tracing::{debug, info};

use crate::error::{LicenseError, LicenseResult};
use crate::key::normalize_key;

/// Result of asking for a slot on a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The device already held a slot. Never consumes another.
    AlreadyActive,
    /// The device took a free slot.
    Admitted,
    /// Every slot is taken by other devices.
    LimitReached,
}

impl ActivationOutcome {
    /// Returns true if the device may use the license.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::AlreadyActive | Self::Admitted)
    }
}

/// Why an activation request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationDenied {
    /// Unknown key, or the e-mail does not own it. Deliberately the same
    /// answer for both.
    NotFound,
    /// The license is revoked.
    NotActive,
    /// No free slot for a new device.
    LimitReached,
}

/// Answer to an activation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationReply {
    Activated {
        tier: String,
        outcome: ActivationOutcome,
    },
    Denied(ActivationDenied),
}

/// Admits devices onto licenses.
pub struct DeviceActivationManager {
    store: Arc<dyn LicenseStore>,
}

impl DeviceActivationManager {
    pub fn new(store: Arc<dyn LicenseStore>) -> Self {
        Self { store }
    }

    /// Takes a slot on `license` for `device_id`.
    ///
    /// Re-activating a device that already holds a slot returns
    /// [`ActivationOutcome::AlreadyActive`] and writes nothing. The append
    /// itself is the store's conditional insert, so concurrent requests for
    /// the last free slot admit exactly one device.
    ///
    /// # Errors
    ///
    /// Only storage failures.
    pub fn activate(&self, license: &License, device_id: &str) -> LicenseResult<ActivationOutcome> {
        if license.has_device(device_id) {
            debug!(license = %license.id, device_id, "device already active");
            return Ok(ActivationOutcome::AlreadyActive);
        }
        if license.free_slots() == 0 {
            debug!(license = %license.id, device_id, "activation limit reached");
            return Ok(ActivationOutcome::LimitReached);
        }

        // The snapshot above may be stale; the store re-checks atomically.
        let outcome = match self.store.append_device(license.id, device_id)? {
            DeviceAppend::Appended => {
                info!(license = %license.id, device_id, "device activated");
                ActivationOutcome::Admitted
            }
            DeviceAppend::AlreadyPresent => ActivationOutcome::AlreadyActive,
            DeviceAppend::Full => {
                debug!(license = %license.id, device_id, "lost race for last slot");
                ActivationOutcome::LimitReached
            }
        };
        Ok(outcome)
    }

    /// Full activation request: resolve the key, check that `email` owns it
    /// and that it is active, then take a slot.
    ///
    /// # Errors
    ///
    /// [`LicenseError::InvalidRequest`] for a blank device id, otherwise only
    /// storage failures.
    pub fn activate_by_key(
        &self,
        email: &str,
        key: &str,
        device_id: &str,
    ) -> LicenseResult<ActivationReply> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(LicenseError::InvalidRequest("Device ID is required".into()));
        }

        let Ok(email) = Email::parse(email) else {
            return Ok(ActivationReply::Denied(ActivationDenied::NotFound));
        };
        let Some(license) = self.store.find_license_by_key(&normalize_key(key))? else {
            return Ok(ActivationReply::Denied(ActivationDenied::NotFound));
        };
        let owner = self.store.find_identity(license.owner)?;
        if owner.is_none_or(|o| o.email != email) {
            debug!(license = %license.id, "activation e-mail does not match owner");
            return Ok(ActivationReply::Denied(ActivationDenied::NotFound));
        }
        if !license.is_active() {
            return Ok(ActivationReply::Denied(ActivationDenied::NotActive));
        }

        let reply = match self.activate(&license, device_id)? {
            ActivationOutcome::LimitReached => {
                ActivationReply::Denied(ActivationDenied::LimitReached)
            }
            outcome => ActivationReply::Activated {
                tier: license.tier,
                outcome,
            },
        };
        Ok(reply)
    }
}
