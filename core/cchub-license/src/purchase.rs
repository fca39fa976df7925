//! Exactly-once license minting for purchase webhooks.
//!
//! Processors deliver at least once. The transaction row keyed by the
//! processor's id is written before anything else, and the store's unique
//! index on that id is the only authority on "seen before". A crash after
//! the row is written leaves a transaction without a license, never two
//! licenses for one payment.

use std::sync::Arc;

use cchub_store::{LicenseStore, StorageError, TransactionInsert, UniqueField};
use cchub_types::{
    Email, Identity, License, LicenseStatus, NewLicense, NewTransaction, Processor, TransactionId,
};
use tracing::{error, info, warn};

use crate::error::{LicenseError, LicenseResult};
use crate::key::{KeyGenerator, MAX_KEY_ATTEMPTS};
use crate::notify::{LicenseMessage, NotificationDispatcher};
use crate::plan::Plan;
use crate::salt::{generate_salt, DEFAULT_SALT_LENGTH};

/// A purchase notification as received from a processor.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseEvent {
    pub processor: Processor,
    pub processor_id: String,
    pub buyer_email: String,
    pub buyer_name: String,
    /// Full webhook body, stored verbatim.
    pub payload: serde_json::Value,
}

/// Result of processing a purchase notification.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    /// First delivery: a license was minted.
    Issued(License),
    /// The processor id was seen before; nothing was written.
    AlreadyProcessed,
}

/// Applies purchase notifications to the store at most once.
pub struct PurchaseGate {
    store: Arc<dyn LicenseStore>,
    keys: KeyGenerator,
    plan: Plan,
    notifier: NotificationDispatcher,
}

impl PurchaseGate {
    pub fn new(
        store: Arc<dyn LicenseStore>,
        keys: KeyGenerator,
        plan: Plan,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            keys,
            plan,
            notifier,
        }
    }

    /// Processes one delivery of a purchase notification.
    ///
    /// # Errors
    ///
    /// [`LicenseError::InvalidRequest`] for a missing transaction id or a
    /// malformed e-mail (nothing is written), storage failures, and
    /// [`LicenseError::ExhaustedRetries`] if no free key could be drawn.
    pub fn process(&self, event: PurchaseEvent) -> LicenseResult<PurchaseOutcome> {
        let processor_id = event.processor_id.trim();
        if processor_id.is_empty() {
            return Err(LicenseError::InvalidRequest("transaction_id is required".into()));
        }
        let email = Email::parse(&event.buyer_email)
            .map_err(|e| LicenseError::InvalidRequest(e.to_string()))?;

        // Fast path for the common retry; the insert below is what decides.
        if self.store.find_transaction(processor_id)?.is_some() {
            info!(processor_id, "purchase already processed");
            return Ok(PurchaseOutcome::AlreadyProcessed);
        }

        let record = NewTransaction {
            processor: event.processor,
            processor_id: processor_id.to_string(),
            buyer_email: email.clone(),
            buyer_name: event.buyer_name.trim().to_string(),
            payload: event.payload,
        };
        let transaction = match self.store.insert_transaction(&record)? {
            TransactionInsert::Inserted(tx) => tx,
            TransactionInsert::Duplicate => {
                info!(processor_id, "purchase processed concurrently");
                return Ok(PurchaseOutcome::AlreadyProcessed);
            }
        };

        let license = self
            .store
            .find_or_create_identity(&email, &record.buyer_name)
            .map_err(LicenseError::from)
            .and_then(|owner| self.mint(&owner, transaction.id).map(|l| (owner, l)));
        let (owner, license) = match license {
            Ok(pair) => pair,
            Err(e) => {
                error!(
                    processor_id,
                    transaction = %transaction.id,
                    error = %e,
                    "transaction recorded without a license"
                );
                return Err(e);
            }
        };

        info!(
            processor_id,
            processor = %record.processor,
            license = %license.id,
            "license issued"
        );
        self.notifier.dispatch(LicenseMessage::new(
            owner.email,
            record.buyer_name,
            vec![license.key.clone()],
        ));
        Ok(PurchaseOutcome::Issued(license))
    }

    /// Inserts a fresh license for `owner`, redrawing the key when the
    /// unique index reports it taken.
    fn mint(&self, owner: &Identity, purchase: TransactionId) -> LicenseResult<License> {
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let key = self.keys.generate(self.store.as_ref())?;
            let new = NewLicense {
                key,
                key_salt: generate_salt(DEFAULT_SALT_LENGTH),
                owner: owner.id,
                status: LicenseStatus::Active,
                tier: self.plan.tier.clone(),
                activation_limit: self.plan.activation_limit,
                purchase: Some(purchase),
            };
            match self.store.insert_license(&new) {
                Ok(license) => return Ok(license),
                Err(StorageError::UniqueViolation(UniqueField::LicenseKey)) => {
                    warn!(attempt, "license key taken at insert, redrawing");
                }
                Err(e @ StorageError::UniqueViolation(UniqueField::LicenseSalt)) => {
                    error!("license salt collision");
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        error!(attempts = MAX_KEY_ATTEMPTS, "license key inserts kept colliding");
        Err(LicenseError::ExhaustedRetries(MAX_KEY_ATTEMPTS))
    }
}
