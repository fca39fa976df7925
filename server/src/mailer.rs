//! Mail delivery through an HTTP relay.

use std::time::Duration;

use async_trait::async_trait;
use cchub_license::{LicenseMessage, Notifier, NotifyError};
use serde::Serialize;
use tracing::debug;
use url::Url;

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct RelayMessage<'a> {
    to_email: &'a str,
    to_name: &'a str,
    subject: &'a str,
    text: String,
    keys: &'a [String],
}

/// Posts license messages as JSON to a mail relay endpoint.
///
/// Any 2xx answer counts as delivered. There are no retries.
#[derive(Debug, Clone)]
pub struct HttpMailNotifier {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpMailNotifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::Delivery`] if `endpoint` is not an absolute
    /// `http`/`https` URL or the HTTP client cannot be built.
    pub fn new(endpoint: &str) -> Result<Self, NotifyError> {
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| NotifyError::Delivery(format!("invalid mail relay URL: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(NotifyError::Delivery(format!(
                "mail relay URL must be http or https, got {}",
                endpoint.scheme()
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Notifier for HttpMailNotifier {
    fn name(&self) -> &str {
        "http-relay"
    }

    async fn send(&self, message: &LicenseMessage) -> Result<(), NotifyError> {
        let body = RelayMessage {
            to_email: message.to_email.as_str(),
            to_name: &message.to_name,
            subject: message.subject(),
            text: message.body(),
            keys: &message.keys,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        debug!(to = %message.to_email, "license mail handed to relay");
        Ok(())
    }
}
