use cchub_types::{IdentityId, LicenseId, TransactionId, VersionId};
use std::collections::HashSet;
use std::str::FromStr;

// ── LicenseId ─────────────────────────────────────────────────────

#[test]
fn license_id_new_is_unique() {
    let a = LicenseId::new();
    let b = LicenseId::new();
    assert_ne!(a, b);
}

#[test]
fn license_id_display_and_parse() {
    let id = LicenseId::new();
    let parsed = LicenseId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn license_id_parse_invalid() {
    assert!(LicenseId::parse("not-a-uuid").is_err());
    assert!(LicenseId::from_str("garbage").is_err());
}

#[test]
fn license_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    assert_eq!(LicenseId::from_uuid(uuid).as_uuid(), uuid);
}

#[test]
fn license_ids_are_time_ordered() {
    let first = LicenseId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = LicenseId::new();
    assert!(first < second);
}

#[test]
fn license_id_serializes_transparently() {
    let id = LicenseId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
    let parsed: LicenseId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

// ── Other ids ─────────────────────────────────────────────────────

#[test]
fn identity_id_hash_and_eq() {
    let id = IdentityId::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id);
    assert_eq!(set.len(), 1);
}

#[test]
fn transaction_id_default_is_unique() {
    assert_ne!(TransactionId::default(), TransactionId::default());
}

#[test]
fn version_id_from_str() {
    let id = VersionId::new();
    let parsed: VersionId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
}
