//! Lost-license recovery by e-mail.
//!
//! The caller learns nothing: every request gets the same answer whether or
//! not the address owns licenses. Matching owners get all their keys mailed.

use std::sync::Arc;

use cchub_store::LicenseStore;
use cchub_types::Email;
use tracing::{debug, info, warn};

use crate::notify::{LicenseMessage, NotificationDispatcher};

pub struct LicenseRecovery {
    store: Arc<dyn LicenseStore>,
    notifier: NotificationDispatcher,
}

impl LicenseRecovery {
    pub fn new(store: Arc<dyn LicenseStore>, notifier: NotificationDispatcher) -> Self {
        Self { store, notifier }
    }

    /// Mails every key owned by `email`, newest first, if there are any.
    pub fn request(&self, email: &str) {
        let Ok(email) = Email::parse(email) else {
            debug!("license recovery for malformed address ignored");
            return;
        };
        let owner = match self.store.find_identity_by_email(&email) {
            Ok(Some(owner)) => owner,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "identity lookup failed during license recovery");
                return;
            }
        };
        let licenses = match self.store.licenses_for_identity(owner.id) {
            Ok(licenses) => licenses,
            Err(e) => {
                warn!(identity = %owner.id, error = %e, "license lookup failed during recovery");
                return;
            }
        };
        if licenses.is_empty() {
            return;
        }

        info!(identity = %owner.id, count = licenses.len(), "mailing license keys");
        let keys = licenses.into_iter().map(|l| l.key).collect();
        self.notifier
            .dispatch(LicenseMessage::new(owner.email, owner.name, keys));
    }
}
