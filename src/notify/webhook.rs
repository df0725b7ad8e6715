//! Chat webhook notification sender.
//!
//! Posts `{"msg": "..."}` to a robot webhook URL (DingTalk by default).

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ReleaseFlowError, Result};

/// JSON body sent to the webhook
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ChannelMessage {
    pub msg: String,
}

/// Incoming-webhook notifier
pub struct WebhookNotifier {
    url: String,
    http: reqwest::blocking::Client,
}

impl WebhookNotifier {
    /// Create a notifier posting to `url`
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(WebhookNotifier {
            url: url.into(),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a message to the channel.
    pub fn send(&self, message: &str) -> Result<()> {
        debug!(len = message.len(), "sending webhook message");

        let resp = self
            .http
            .post(&self.url)
            .json(&ChannelMessage {
                msg: message.to_string(),
            })
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            warn!(status = %status, body = %body, "webhook returned error");
            return Err(ReleaseFlowError::notify(format!("HTTP {}: {}", status, body)));
        }

        info!("webhook message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let payload = serde_json::to_value(ChannelMessage {
            msg: "release locked".to_string(),
        })
        .unwrap();
        assert_eq!(payload, serde_json::json!({ "msg": "release locked" }));
    }

    #[test]
    fn test_construction() {
        let notifier = WebhookNotifier::new("https://example.com/robot?token=abc").unwrap();
        assert_eq!(notifier.url(), "https://example.com/robot?token=abc");
    }

    #[test]
    fn test_unreachable_endpoint_is_an_error() {
        // Port 9 (discard) is closed on loopback in test environments.
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/robot").unwrap();
        assert!(notifier.send("hello").is_err());
    }
}
