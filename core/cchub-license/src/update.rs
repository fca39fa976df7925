//! Update resolution for installed clients.

use std::fmt;
use std::sync::Arc;

use cchub_store::LicenseStore;
use cchub_types::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{LicenseError, LicenseResult};

/// Public address of this service, used to build artifact download URLs.
///
/// Parsed once at startup; a missing or malformed value is a fatal
/// configuration error, never a per-request one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicBaseUrl(Url);

impl PublicBaseUrl {
    /// Parses and validates the configured base address.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] unless the value is an absolute
    /// `http`/`https` URL with a host and no query or fragment.
    pub fn parse(raw: &str) -> LicenseResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LicenseError::Config("public base URL is not set".into()));
        }
        let url = Url::parse(raw)
            .map_err(|e| LicenseError::Config(format!("invalid public base URL {raw:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LicenseError::Config(format!(
                "public base URL must be http or https, got {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(LicenseError::Config(format!("public base URL {raw:?} has no host")));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(LicenseError::Config(format!(
                "public base URL {raw:?} must not carry a query or fragment"
            )));
        }
        Ok(Self(url))
    }

    /// Download location of a release artifact:
    /// `{base}/api/files/versions/{version_id}/{artifact}`.
    #[must_use]
    pub fn artifact_url(&self, version: &Version) -> String {
        let mut url = self.0.clone();
        let version_id = version.id.to_string();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "api",
                "files",
                "versions",
                version_id.as_str(),
                version.artifact.as_str(),
            ]);
        }
        url.to_string()
    }
}

impl fmt::Display for PublicBaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a client needs to fetch and verify a newer build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub force_update: bool,
    pub version_string: String,
    pub release_notes: String,
    pub download_url: String,
    pub signature_eddsa: String,
}

/// Finds the newest published build above a client's current one.
#[derive(Clone)]
pub struct UpdateResolver {
    store: Arc<dyn LicenseStore>,
    base_url: PublicBaseUrl,
}

impl UpdateResolver {
    pub fn new(store: Arc<dyn LicenseStore>, base_url: PublicBaseUrl) -> Self {
        Self { store, base_url }
    }

    /// Returns `None` when the client is on the newest published build.
    ///
    /// `force_update` is set when the newest release carries a non-zero
    /// `min_required_build` that the client is below.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub fn resolve(&self, current_build: i64) -> LicenseResult<Option<UpdateInfo>> {
        let Some(latest) = self.store.latest_published_version_above(current_build)? else {
            return Ok(None);
        };
        let force_update = latest.forces_upgrade_from(current_build);
        debug!(
            current_build,
            latest_build = latest.build_number,
            force_update,
            "update available"
        );
        Ok(Some(UpdateInfo {
            force_update,
            download_url: self.base_url.artifact_url(&latest),
            version_string: latest.version_string,
            release_notes: latest.release_notes,
            signature_eddsa: latest.signature_eddsa,
        }))
    }
}
