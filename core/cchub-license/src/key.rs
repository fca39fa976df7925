//! License key generation.
//!
//! Keys have the form `PREFIX-XXX-XXX`. Each `X` is drawn from the OS CSPRNG
//! over [`KEY_ALPHABET`], which leaves out `0`, `O`, `1`, `I` and `L` so keys
//! survive being read aloud or retyped from a screenshot.
//!
//! Knowing a key grants activation rights, so keys are never drawn from a
//! seeded or thread-local generator.

use cchub_store::LicenseStore;
use rand::rngs::OsRng;
use rand::Rng;
use tracing::{debug, error};

use crate::error::{LicenseError, LicenseResult};

/// Symbols a key segment may contain.
pub const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Prefix of keys issued for CursorClip Recorder.
pub const DEFAULT_KEY_PREFIX: &str = "C1P";

/// Draws tried before giving up on finding an unused key.
pub const MAX_KEY_ATTEMPTS: u32 = 10;

const SEGMENT_LEN: usize = 3;

/// Produces keys that are unused in the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGenerator {
    prefix: String,
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl KeyGenerator {
    /// Creates a generator with the default `C1P` prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator with a custom prefix.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if the prefix is empty or contains
    /// anything but ASCII uppercase letters and digits.
    pub fn with_prefix(prefix: &str) -> LicenseResult<Self> {
        let valid = !prefix.is_empty()
            && prefix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !valid {
            return Err(LicenseError::Config(format!("invalid key prefix: {prefix:?}")));
        }
        Ok(Self {
            prefix: prefix.to_string(),
        })
    }

    /// Returns the key prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Draws a candidate key without checking the store.
    #[must_use]
    pub fn draw(&self) -> String {
        let first = random_segment();
        let second = random_segment();
        format!("{}-{first}-{second}", self.prefix)
    }

    /// Draws keys until one is not used by any license.
    ///
    /// The store's unique index on `key` stays authoritative: a key returned
    /// here can still lose a race at insert time, and the caller redraws.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::ExhaustedRetries`] after
    /// [`MAX_KEY_ATTEMPTS`] collisions, or a storage error from the lookup.
    pub fn generate(&self, store: &dyn LicenseStore) -> LicenseResult<String> {
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let candidate = self.draw();
            if !store.license_key_exists(&candidate)? {
                return Ok(candidate);
            }
            debug!(attempt, "license key collision, redrawing");
        }
        error!(
            attempts = MAX_KEY_ATTEMPTS,
            prefix = %self.prefix,
            "license key space exhausted or RNG broken"
        );
        Err(LicenseError::ExhaustedRetries(MAX_KEY_ATTEMPTS))
    }

    /// Returns true if `key` has this generator's prefix and two segments
    /// over [`KEY_ALPHABET`].
    #[must_use]
    pub fn is_well_formed(&self, key: &str) -> bool {
        let mut parts = key.split('-');
        let (Some(prefix), Some(first), Some(second), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        prefix == self.prefix && is_segment(first) && is_segment(second)
    }
}

/// Canonical form of a user-entered key: trimmed and uppercased.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

fn random_segment() -> String {
    let mut rng = OsRng;
    (0..SEGMENT_LEN)
        .map(|_| char::from(KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())]))
        .collect()
}

fn is_segment(segment: &str) -> bool {
    segment.len() == SEGMENT_LEN && segment.bytes().all(|b| KEY_ALPHABET.contains(&b))
}
