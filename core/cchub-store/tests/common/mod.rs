//! Shared fixtures for store tests.

#![allow(dead_code)]

use cchub_store::{LicenseStore, SqliteStore};
use cchub_types::{Email, Identity, License, LicenseStatus, NewLicense, NewVersion};

pub fn store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

pub fn identity(store: &SqliteStore, email: &str) -> Identity {
    store
        .find_or_create_identity(&Email::parse(email).unwrap(), "Test Buyer")
        .unwrap()
}

pub fn new_license(owner: &Identity, key: &str, salt: &str, limit: u32) -> NewLicense {
    NewLicense {
        key: key.to_string(),
        key_salt: salt.to_string(),
        owner: owner.id,
        status: LicenseStatus::Active,
        tier: "pro".to_string(),
        activation_limit: limit,
        purchase: None,
    }
}

pub fn license(store: &SqliteStore, key: &str, limit: u32) -> License {
    let owner = identity(store, "owner@example.com");
    store
        .insert_license(&new_license(&owner, key, &format!("salt-{key}"), limit))
        .unwrap()
}

pub fn new_version(build: i64, published: bool, min_required: i64) -> NewVersion {
    NewVersion {
        build_number: build,
        version_string: format!("1.0.{build}"),
        release_notes: format!("Build {build}"),
        artifact: format!("CursorClip-{build}.dmg"),
        signature_eddsa: format!("sig-{build}"),
        is_published: published,
        min_required_build: min_required,
    }
}
