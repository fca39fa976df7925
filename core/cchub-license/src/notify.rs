//! Best-effort delivery of license keys to buyers.
//!
//! Delivery runs on a detached tokio task. Nothing flows back into the
//! request that triggered it; failures end up in the log and nowhere else.

use std::sync::Arc;

use async_trait::async_trait;
use cchub_types::Email;
use serde::Serialize;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const SUBJECT: &str = "Your CursorClip Recorder License Key";

/// A message carrying one or more license keys to their owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseMessage {
    pub to_email: Email,
    pub to_name: String,
    pub keys: Vec<String>,
}

impl LicenseMessage {
    pub fn new(to_email: Email, to_name: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            to_email,
            to_name: to_name.into(),
            keys,
        }
    }

    #[must_use]
    pub fn subject(&self) -> &'static str {
        SUBJECT
    }

    /// Plain-text body listing every key on its own line.
    #[must_use]
    pub fn body(&self) -> String {
        let greeting = if self.to_name.trim().is_empty() {
            "Hello,".to_string()
        } else {
            format!("Hello {},", self.to_name.trim())
        };
        let label = if self.keys.len() == 1 {
            "Your License Key is:"
        } else {
            "Your License Keys are:"
        };
        format!(
            "{greeting}\n\n\
             Thank you for your interest in CursorClip Recorder!\n\n\
             {label}\n\n\
             {}\n\n\
             Best regards,\n\
             The CursorClip Team\n",
            self.keys.join("\n")
        )
    }
}

/// Notification delivery failures. Never surfaced to API callers.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("mail relay rejected message with status {0}")]
    Rejected(u16),
}

/// Sends license messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    async fn send(&self, message: &LicenseMessage) -> Result<(), NotifyError>;
}

/// Notifier that only logs. Used when no mail relay is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &LicenseMessage) -> Result<(), NotifyError> {
        info!(
            to = %message.to_email,
            keys = message.keys.len(),
            "license mail not sent: no mail relay configured"
        );
        Ok(())
    }
}

/// Fire-and-forget front of a [`Notifier`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Spawns delivery of `message` and returns immediately.
    ///
    /// The handle is for tests; production callers drop it. Returns `None`
    /// (and logs) when called outside a tokio runtime.
    pub fn dispatch(&self, message: LicenseMessage) -> Option<JoinHandle<()>> {
        let Ok(runtime) = Handle::try_current() else {
            warn!(to = %message.to_email, "no async runtime, license mail dropped");
            return None;
        };
        let notifier = Arc::clone(&self.notifier);
        Some(runtime.spawn(async move {
            if let Err(e) = notifier.send(&message).await {
                warn!(
                    notifier = notifier.name(),
                    to = %message.to_email,
                    error = %e,
                    "failed to send license mail"
                );
            }
        }))
    }
}
