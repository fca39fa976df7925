//! CursorClip license hub
//!
//! Usage:
//!   cchub-server serve --public-url https://hub.example.com
//!   cchub-server add-version --build 42 --version-string 1.4.2 \
//!       --artifact CursorClip-1.4.2.dmg --signature <sig> --publish

use std::sync::Arc;

use anyhow::{Context, Result};
use cchub_license::{LogNotifier, Notifier};
use cchub_server::{
    build_router, AddVersionArgs, AppState, Cli, Command, HttpMailNotifier, ServeArgs,
};
use cchub_store::{LicenseStore, SqliteStore};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::AddVersion(args) => add_version(&args),
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    // Every download URL depends on this; refuse to start without it.
    let base_url = args
        .public_base_url()
        .context("--public-url / CCHUB_PUBLIC_URL must be a valid http(s) URL")?;
    let plan = args.plan().context("invalid license plan")?;
    let store = SqliteStore::open(&args.db)
        .with_context(|| format!("failed to open database {}", args.db.display()))?;

    let notifier: Arc<dyn Notifier> = match &args.mail_relay_url {
        Some(url) => Arc::new(HttpMailNotifier::new(url).context("invalid mail relay URL")?),
        None => {
            warn!("no mail relay configured, license keys will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let state = AppState::new(Arc::new(store), base_url.clone(), plan.clone(), notifier);
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;

    info!(
        bind = %args.bind,
        db = %args.db.display(),
        public_url = %base_url,
        tier = %plan.tier,
        activation_limit = plan.activation_limit,
        "license hub listening"
    );
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    info!("license hub stopped");
    Ok(())
}

fn add_version(args: &AddVersionArgs) -> Result<()> {
    let store = SqliteStore::open(&args.db)
        .with_context(|| format!("failed to open database {}", args.db.display()))?;
    let version = store
        .insert_version(&args.to_new_version())
        .with_context(|| format!("failed to record build {}", args.build))?;
    info!(
        id = %version.id,
        build = version.build_number,
        published = version.is_published,
        "version recorded"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
