#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cchub_license::{LicenseMessage, Notifier, NotifyError, Plan, PublicBaseUrl};
use cchub_server::{build_router, AppState};
use cchub_store::{LicenseStore, SqliteStore};
use cchub_types::{Email, License, LicenseStatus, NewLicense, NewVersion, Version};
use tokio::sync::mpsc;

pub const PUBLIC_URL: &str = "https://hub.example.com";

pub struct TestServer {
    pub base: String,
    pub store: SqliteStore,
    pub mail: mpsc::UnboundedReceiver<LicenseMessage>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn next_mail(&mut self) -> Option<LicenseMessage> {
        tokio::time::timeout(Duration::from_secs(2), self.mail.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn assert_no_mail(&mut self) {
        let got = tokio::time::timeout(Duration::from_millis(100), self.mail.recv()).await;
        assert!(!matches!(got, Ok(Some(_))), "unexpected mail: {got:?}");
    }

    pub fn seed_license(
        &self,
        email: &str,
        key: &str,
        limit: u32,
        status: LicenseStatus,
    ) -> License {
        let owner = self
            .store
            .find_or_create_identity(&Email::parse(email).unwrap(), "Test Owner")
            .unwrap();
        self.store
            .insert_license(&NewLicense {
                key: key.to_string(),
                key_salt: format!("salt-{key}"),
                owner: owner.id,
                status,
                tier: "pro".to_string(),
                activation_limit: limit,
                purchase: None,
            })
            .unwrap()
    }

    pub fn seed_version(&self, build: i64, min_required: i64) -> Version {
        self.store
            .insert_version(&NewVersion {
                build_number: build,
                version_string: format!("1.0.{build}"),
                release_notes: format!("Build {build}"),
                artifact: format!("CursorClip-{build}.dmg"),
                signature_eddsa: format!("sig-{build}"),
                is_published: true,
                min_required_build: min_required,
            })
            .unwrap()
    }
}

struct ChannelNotifier(mpsc::UnboundedSender<LicenseMessage>);

#[async_trait]
impl Notifier for ChannelNotifier {
    fn name(&self) -> &str {
        "channel"
    }

    async fn send(&self, message: &LicenseMessage) -> Result<(), NotifyError> {
        self.0
            .send(message.clone())
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

/// Spin up the HTTP server on an OS-assigned port over an in-memory store.
pub async fn spawn_test_server() -> TestServer {
    let store = SqliteStore::open_in_memory().unwrap();
    let (tx, mail) = mpsc::unbounded_channel();
    let state = AppState::new(
        Arc::new(store.clone()),
        PublicBaseUrl::parse(PUBLIC_URL).unwrap(),
        Plan::new("pro", 2).unwrap(),
        Arc::new(ChannelNotifier(tx)),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        store,
        mail,
    }
}
