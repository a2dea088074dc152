//! HTTP webhook notifier.
//!
//! Posts an embed-style JSON document to a per-channel webhook URL.
//! Channels without a URL are written to the log instead.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::debug;

use super::{ChannelKey, LogNotifier, Notifier, NotifyError, StructuredMessage};

/// Webhook sink with one URL per channel.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    routes: HashMap<ChannelKey, String>,
    http: reqwest::Client,
    fallback: LogNotifier,
}

impl WebhookNotifier {
    /// Creates a notifier for the given routes.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(routes: HashMap<ChannelKey, String>, timeout: Duration) -> Result<Self, NotifyError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("swapwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            routes,
            http,
            fallback: LogNotifier::new(),
        })
    }

    /// Returns the URL for a channel.
    #[must_use]
    pub fn route(&self, channel: ChannelKey) -> Option<&str> {
        self.routes.get(&channel).map(String::as_str)
    }

    /// Returns the channels that have no webhook and go to the log.
    #[must_use]
    pub fn unrouted(&self) -> Vec<ChannelKey> {
        ChannelKey::ALL
            .into_iter()
            .filter(|channel| !self.routes.contains_key(channel))
            .collect()
    }

    /// Builds the request body for a message.
    #[must_use]
    pub fn payload(message: &StructuredMessage) -> Value {
        let mut embed = json!({
            "title": message.title,
            "color": message.color,
            "fields": message.fields,
            "footer": { "text": message.footer },
        });
        if let (Some(url), Some(map)) = (&message.url, embed.as_object_mut()) {
            map.insert("url".to_string(), Value::String(url.clone()));
        }
        json!({ "embeds": [embed] })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(
        &self,
        channel: ChannelKey,
        message: &StructuredMessage,
    ) -> Result<(), NotifyError> {
        let Some(url) = self.route(channel) else {
            return self.fallback.send(channel, message).await;
        };

        let response = self
            .http
            .post(url)
            .json(&Self::payload(message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!("Delivered '{}' to {} channel", message.title, channel);
        Ok(())
    }
}
