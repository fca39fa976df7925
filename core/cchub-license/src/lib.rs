//! License issuance and validation for the CursorClip license hub.
//!
//! This crate handles:
//! - Unique human-typable license keys and per-license salts
//! - Device activation against a per-license slot budget
//! - Exactly-once license minting under at-least-once purchase webhooks
//! - Update resolution with a forced-upgrade floor
//! - The periodic client check-in that merges activation and update status
//! - Lost-license recovery by e-mail
//!
//! # Design Principles
//!
//! - **Storage owns the races**: slot admission and purchase dedup are atomic
//!   operations of [`cchub_store::LicenseStore`], never check-then-act here
//! - **Outcomes are not errors**: limit reached, duplicate webhook and unknown
//!   e-mail are result variants; [`LicenseError`] is reserved for failures
//! - **Mail is off the critical path**: notifications are detached tasks whose
//!   failure is only visible in logs

mod activation;
mod checkin;
mod error;
mod key;
mod notify;
mod plan;
mod purchase;
mod recovery;
mod salt;
mod update;

pub use activation::{ActivationDenied, ActivationOutcome, ActivationReply, DeviceActivationManager};
pub use checkin::{ActivationState, CheckinReport, CheckinService, CheckinStatus};
pub use error::{LicenseError, LicenseResult};
pub use key::{normalize_key, KeyGenerator, DEFAULT_KEY_PREFIX, KEY_ALPHABET, MAX_KEY_ATTEMPTS};
pub use notify::{LicenseMessage, LogNotifier, NotificationDispatcher, Notifier, NotifyError};
pub use plan::Plan;
pub use purchase::{PurchaseEvent, PurchaseGate, PurchaseOutcome};
pub use recovery::LicenseRecovery;
pub use salt::{generate_salt, DEFAULT_SALT_LENGTH, SALT_ALPHABET};
pub use update::{PublicBaseUrl, UpdateInfo, UpdateResolver};
