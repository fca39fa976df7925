mod common;

use std::sync::Arc;
use std::thread;

use cchub_license::{
    ActivationDenied, ActivationOutcome, ActivationReply, DeviceActivationManager, LicenseError,
};
use cchub_store::LicenseStore;
use cchub_types::LicenseStatus;
use common::{seed_license, FaultyStore};
use pretty_assertions::assert_eq;

const OWNER: &str = "owner@example.com";
const KEY: &str = "C1P-AB2-XY9";

fn setup(limit: u32, status: LicenseStatus) -> (Arc<FaultyStore>, DeviceActivationManager) {
    let store = Arc::new(FaultyStore::new());
    seed_license(store.as_ref(), OWNER, KEY, limit, status);
    let manager = DeviceActivationManager::new(store.clone());
    (store, manager)
}

fn activated(tier: &str, outcome: ActivationOutcome) -> ActivationReply {
    ActivationReply::Activated {
        tier: tier.to_string(),
        outcome,
    }
}

#[test]
fn two_slot_license_scenario() {
    let (store, manager) = setup(2, LicenseStatus::Active);

    assert_eq!(
        manager.activate_by_key(OWNER, KEY, "d1").unwrap(),
        activated("pro", ActivationOutcome::Admitted)
    );
    assert_eq!(
        manager.activate_by_key(OWNER, KEY, "d2").unwrap(),
        activated("pro", ActivationOutcome::Admitted)
    );
    assert_eq!(
        manager.activate_by_key(OWNER, KEY, "d3").unwrap(),
        ActivationReply::Denied(ActivationDenied::LimitReached)
    );
    assert_eq!(
        manager.activate_by_key(OWNER, KEY, "d1").unwrap(),
        activated("pro", ActivationOutcome::AlreadyActive)
    );

    let license = store.find_license_by_key(KEY).unwrap().unwrap();
    assert_eq!(license.activated_devices, vec!["d1", "d2"]);
}

#[test]
fn reactivation_does_not_consume_a_slot() {
    let (store, manager) = setup(3, LicenseStatus::Active);
    let license = store.find_license_by_key(KEY).unwrap().unwrap();

    assert_eq!(manager.activate(&license, "d1").unwrap(), ActivationOutcome::Admitted);
    let license = store.find_license_by_key(KEY).unwrap().unwrap();
    assert_eq!(manager.activate(&license, "d1").unwrap(), ActivationOutcome::AlreadyActive);

    let license = store.find_license_by_key(KEY).unwrap().unwrap();
    assert_eq!(license.activated_devices.len(), 1);
}

#[test]
fn stale_snapshot_is_rechecked_by_the_store() {
    let (store, manager) = setup(1, LicenseStatus::Active);
    let stale = store.find_license_by_key(KEY).unwrap().unwrap();

    assert_eq!(manager.activate(&stale, "d1").unwrap(), ActivationOutcome::Admitted);
    // Same pre-activation snapshot: looks like one free slot, but is full.
    assert_eq!(manager.activate(&stale, "d2").unwrap(), ActivationOutcome::LimitReached);
    // Same device again through the stale snapshot is still idempotent.
    assert_eq!(manager.activate(&stale, "d1").unwrap(), ActivationOutcome::AlreadyActive);
}

#[test]
fn concurrent_activations_respect_the_limit() {
    let (store, manager) = setup(4, LicenseStatus::Active);
    let manager = Arc::new(manager);

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.activate_by_key(OWNER, KEY, &format!("dev-{i}")).unwrap())
        })
        .collect();
    let replies: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let admitted = replies
        .iter()
        .filter(|r| matches!(r, ActivationReply::Activated { .. }))
        .count();
    assert_eq!(admitted, 4);
    assert!(replies
        .iter()
        .filter(|r| !matches!(r, ActivationReply::Activated { .. }))
        .all(|r| *r == ActivationReply::Denied(ActivationDenied::LimitReached)));

    let license = store.find_license_by_key(KEY).unwrap().unwrap();
    assert_eq!(license.activated_devices.len(), 4);
}

#[test]
fn unknown_key_is_not_found() {
    let (_store, manager) = setup(2, LicenseStatus::Active);
    assert_eq!(
        manager.activate_by_key(OWNER, "C1P-ZZZ-ZZZ", "d1").unwrap(),
        ActivationReply::Denied(ActivationDenied::NotFound)
    );
}

#[test]
fn wrong_owner_looks_like_unknown_key() {
    let (store, manager) = setup(2, LicenseStatus::Active);
    assert_eq!(
        manager.activate_by_key("someone-else@example.com", KEY, "d1").unwrap(),
        ActivationReply::Denied(ActivationDenied::NotFound)
    );
    assert_eq!(
        manager.activate_by_key("not an email", KEY, "d1").unwrap(),
        ActivationReply::Denied(ActivationDenied::NotFound)
    );
    let license = store.find_license_by_key(KEY).unwrap().unwrap();
    assert!(license.activated_devices.is_empty());
}

#[test]
fn email_and_key_are_normalized() {
    let (_store, manager) = setup(2, LicenseStatus::Active);
    assert_eq!(
        manager
            .activate_by_key("  OWNER@Example.com ", " c1p-ab2-xy9 ", "d1")
            .unwrap(),
        activated("pro", ActivationOutcome::Admitted)
    );
}

#[test]
fn revoked_license_is_not_active() {
    let (store, manager) = setup(2, LicenseStatus::Revoked);
    assert_eq!(
        manager.activate_by_key(OWNER, KEY, "d1").unwrap(),
        ActivationReply::Denied(ActivationDenied::NotActive)
    );
    let license = store.find_license_by_key(KEY).unwrap().unwrap();
    assert!(license.activated_devices.is_empty());
}

#[test]
fn blank_device_id_is_a_validation_error() {
    let (_store, manager) = setup(2, LicenseStatus::Active);
    for device in ["", "   "] {
        assert!(matches!(
            manager.activate_by_key(OWNER, KEY, device),
            Err(LicenseError::InvalidRequest(_))
        ));
    }
}

#[test]
fn storage_failure_is_an_error() {
    let (store, manager) = setup(2, LicenseStatus::Active);
    store
        .fail_license_lookup
        .store(true, std::sync::atomic::Ordering::SeqCst);
    assert!(matches!(
        manager.activate_by_key(OWNER, KEY, "d1"),
        Err(LicenseError::Storage(_))
    ));
}

#[test]
fn outcome_grant_flags() {
    assert!(ActivationOutcome::Admitted.is_granted());
    assert!(ActivationOutcome::AlreadyActive.is_granted());
    assert!(!ActivationOutcome::LimitReached.is_granted());
}
