//! Table definitions.

pub(crate) const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS identities (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS transactions (
        id TEXT PRIMARY KEY,
        processor TEXT NOT NULL,
        processor_id TEXT NOT NULL,
        buyer_email TEXT NOT NULL,
        buyer_name TEXT NOT NULL,
        payload TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_processor_id
        ON transactions (processor_id);

    CREATE TABLE IF NOT EXISTS licenses (
        id TEXT PRIMARY KEY,
        key TEXT NOT NULL,
        key_salt TEXT NOT NULL,
        owner_id TEXT NOT NULL REFERENCES identities (id),
        status TEXT NOT NULL,
        tier TEXT NOT NULL,
        activation_limit INTEGER NOT NULL CHECK (activation_limit >= 1),
        purchase_id TEXT REFERENCES transactions (id),
        last_checked_at TEXT,
        created_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_licenses_key ON licenses (key);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_licenses_key_salt ON licenses (key_salt);
    CREATE INDEX IF NOT EXISTS idx_licenses_owner ON licenses (owner_id);

    CREATE TABLE IF NOT EXISTS license_devices (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        license_id TEXT NOT NULL REFERENCES licenses (id),
        device_id TEXT NOT NULL,
        activated_at TEXT NOT NULL,
        UNIQUE (license_id, device_id)
    );

    CREATE TABLE IF NOT EXISTS versions (
        id TEXT PRIMARY KEY,
        build_number INTEGER NOT NULL CHECK (build_number >= 0),
        version_string TEXT NOT NULL,
        release_notes TEXT NOT NULL,
        artifact TEXT NOT NULL,
        signature_eddsa TEXT NOT NULL,
        is_published INTEGER NOT NULL DEFAULT 0,
        min_required_build INTEGER NOT NULL DEFAULT 0,
        published_at TEXT,
        created_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_versions_build_number ON versions (build_number);
";
