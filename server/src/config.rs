//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use cchub_license::{LicenseResult, Plan, PublicBaseUrl};
use cchub_types::NewVersion;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cchub-server")]
#[command(about = "CursorClip license hub", version)]
pub struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true, env = "CCHUB_VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Record a release build
    AddVersion(AddVersionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address the HTTP API listens on
    #[arg(long, env = "CCHUB_BIND", default_value = "0.0.0.0:8090")]
    pub bind: SocketAddr,

    /// Path to the SQLite database
    #[arg(long, env = "CCHUB_DB", default_value = "cchub.db")]
    pub db: PathBuf,

    /// Public base address of this service, used in download URLs
    #[arg(long, env = "CCHUB_PUBLIC_URL")]
    pub public_url: String,

    /// Mail relay endpoint; license mails are only logged when unset
    #[arg(long, env = "CCHUB_MAIL_RELAY_URL")]
    pub mail_relay_url: Option<String>,

    /// Tier stamped onto purchased licenses
    #[arg(long, env = "CCHUB_TIER", default_value = "pro")]
    pub tier: String,

    /// Device slots per purchased license
    #[arg(long, env = "CCHUB_ACTIVATION_LIMIT", default_value_t = 3)]
    pub activation_limit: u32,
}

impl ServeArgs {
    /// # Errors
    ///
    /// Fails if the public URL is missing or malformed.
    pub fn public_base_url(&self) -> LicenseResult<PublicBaseUrl> {
        PublicBaseUrl::parse(&self.public_url)
    }

    /// # Errors
    ///
    /// Fails on a blank tier or a zero activation limit.
    pub fn plan(&self) -> LicenseResult<Plan> {
        Plan::new(&self.tier, self.activation_limit)
    }
}

#[derive(Args, Debug, Clone)]
pub struct AddVersionArgs {
    /// Path to the SQLite database
    #[arg(long, env = "CCHUB_DB", default_value = "cchub.db")]
    pub db: PathBuf,

    /// Monotonic build number
    #[arg(long)]
    pub build: i64,

    /// Human-readable version, e.g. 1.4.2
    #[arg(long)]
    pub version_string: String,

    #[arg(long, default_value = "")]
    pub notes: String,

    /// Artifact file name served under the version's download URL
    #[arg(long)]
    pub artifact: String,

    /// EdDSA signature of the artifact
    #[arg(long)]
    pub signature: String,

    /// Clients below this build must upgrade; 0 disables
    #[arg(long, default_value_t = 0)]
    pub min_required_build: i64,

    /// Make the build visible to clients immediately
    #[arg(long)]
    pub publish: bool,
}

impl AddVersionArgs {
    #[must_use]
    pub fn to_new_version(&self) -> NewVersion {
        NewVersion {
            build_number: self.build,
            version_string: self.version_string.clone(),
            release_notes: self.notes.clone(),
            artifact: self.artifact.clone(),
            signature_eddsa: self.signature.clone(),
            is_published: self.publish,
            min_required_build: self.min_required_build,
        }
    }
}
