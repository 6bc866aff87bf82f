//! Chat gateway client (Evolution API)
//!
//! All outbound traffic to the chat platform goes through this client.
//! Every call runs under the crate-wide retry policy; the media fetch is
//! the one endpoint that can report an expired resource, which the policy
//! treats as final.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use crate::retry::RetryPolicy;
use crate::webhook::jid_from_phone;
use crate::{Error, Result};

/// Outbound operations the pipeline needs from the chat platform
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send a plain text message to a phone number
    async fn send_text(&self, phone: &str, text: &str) -> Result<()>;

    /// Show the "typing…" cue in the customer's chat
    async fn send_typing(&self, phone: &str) -> Result<()>;

    /// Clear the typing cue, showing the bot as available
    async fn send_available(&self, phone: &str) -> Result<()>;

    /// Fetch a message's media payload as a base64 string.
    ///
    /// Returns `Error::ResourceExpired` when the gateway has already
    /// discarded the media (HTTP 404).
    async fn fetch_media_base64(&self, message_id: &str) -> Result<String>;

    /// Mark an inbound message as read
    async fn mark_as_read(&self, phone: &str, message_id: &str) -> Result<()>;
}

/// HTTP client for an Evolution API instance
pub struct EvolutionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    instance: String,
    policy: RetryPolicy,
}

impl EvolutionClient {
    #[must_use]
    pub fn new(base_url: &str, api_key: &str, instance: &str, policy: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            instance: instance.to_string(),
            policy,
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}/{}", self.base_url, path, self.instance);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await?;
        Self::into_json(path, response).await
    }

    async fn into_json(path: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::ResourceExpired(format!("{path}: not found")));
        }
        if status.is_server_error() {
            return Err(Error::Transient(format!("{path}: gateway returned {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Gateway(format!("{path}: {status}: {body}")));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        response.json().await.or(Ok(Value::Null))
    }

    async fn send_presence(&self, phone: &str, presence: &str) -> Result<()> {
        let body = json!({
            "number": jid_from_phone(phone),
            "delay": 1200,
            "presence": presence,
        });
        self.post("chat/sendPresence", &body).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for EvolutionClient {
    async fn send_text(&self, phone: &str, text: &str) -> Result<()> {
        let body = json!({
            "number": jid_from_phone(phone),
            "text": text,
        });
        let body = &body;
        self.policy
            .run("send_text", || async move {
                self.post("message/sendText", body).await
            })
            .await?;
        debug!(phone, chars = text.len(), "text message sent");
        Ok(())
    }

    async fn send_typing(&self, phone: &str) -> Result<()> {
        self.send_presence(phone, "composing").await
    }

    async fn send_available(&self, phone: &str) -> Result<()> {
        self.send_presence(phone, "available").await
    }

    async fn fetch_media_base64(&self, message_id: &str) -> Result<String> {
        let encoded = urlencoding::encode(message_id);
        let url = format!(
            "{}/message/media-base64/{}/{}",
            self.base_url, self.instance, encoded
        );
        let url = &url;
        let payload = self
            .policy
            .run("fetch_media_base64", || async move {
                let response = self
                    .http
                    .get(url)
                    .header("apikey", &self.api_key)
                    .send()
                    .await?;
                Self::into_json("message/media-base64", response).await
            })
            .await?;
        payload
            .get("base64")
            .or_else(|| payload.get("media"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Media("media response carried no base64 field".into()))
    }

    async fn mark_as_read(&self, phone: &str, message_id: &str) -> Result<()> {
        let body = json!({
            "readMessages": [{
                "remoteJid": jid_from_phone(phone),
                "fromMe": false,
                "id": message_id,
            }],
        });
        self.post("chat/markMessageAsRead", &body).await?;
        Ok(())
    }
}
