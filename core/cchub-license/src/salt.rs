//! Per-license salts.
//!
//! A salt is an opaque secret stored next to the key for out-of-band
//! verification. Uniqueness is enforced by the store's index on `key_salt`;
//! at 62^32 a collision is not retried but surfaces as a constraint error.

use rand::rngs::OsRng;
use rand::Rng;

/// Symbols a salt may contain.
pub const SALT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Salt length used when minting licenses.
pub const DEFAULT_SALT_LENGTH: usize = 32;

/// Samples `length` characters uniformly from [`SALT_ALPHABET`] using the
/// OS CSPRNG.
#[must_use]
pub fn generate_salt(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(SALT_ALPHABET[rng.gen_range(0..SALT_ALPHABET.len())]))
        .collect()
}
