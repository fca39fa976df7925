mod common;

use cchub_store::LicenseStore;
use cchub_types::Email;
use common::{identity, store};

#[test]
fn find_or_create_creates_once() {
    let store = store();
    let email = Email::parse("buyer@example.com").unwrap();

    let first = store.find_or_create_identity(&email, "First Name").unwrap();
    let second = store.find_or_create_identity(&email, "Second Name").unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.name, "First Name");
}

#[test]
fn lookup_uses_canonical_email() {
    let store = store();
    let created = identity(&store, "  Buyer@Example.COM");

    let found = store
        .find_identity_by_email(&Email::parse("buyer@example.com").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.email.as_str(), "buyer@example.com");
}

#[test]
fn unknown_email_is_none() {
    let store = store();
    let found = store
        .find_identity_by_email(&Email::parse("nobody@example.com").unwrap())
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn find_identity_by_id() {
    let store = store();
    let created = identity(&store, "buyer@example.com");
    let found = store.find_identity(created.id).unwrap().unwrap();
    assert_eq!(found, created);
    assert!(store.find_identity(cchub_types::IdentityId::new()).unwrap().is_none());
}
