//! Inbound webhook payload types
//!
//! The chat gateway posts events in an envelope that sometimes wraps the
//! event under a `body` key. Only `messages.upsert` events are processed;
//! anything else is ignored upstream of the pipeline.

use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

const JID_SUFFIX: &str = "@s.whatsapp.net";

/// Event envelope as posted by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: Option<String>,
    pub instance: Option<String>,
    pub data: Option<EventData>,
}

/// The `data` object of a message event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub key: Option<MessageKey>,
    pub push_name: Option<String>,
    pub message_type: Option<String>,
    pub message_timestamp: Option<i64>,
    #[serde(default)]
    pub message: Value,
}

/// Identity of a single message
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub remote_jid: Option<String>,
    #[serde(default)]
    pub from_me: bool,
    pub id: Option<String>,
}

impl WebhookEvent {
    /// Parse a raw JSON payload, unwrapping an optional `body` envelope.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` when the payload is not an object.
    pub fn parse(raw: &Value) -> Result<Self> {
        let inner = match raw.get("body") {
            Some(body) if body.is_object() => body,
            _ => raw,
        };
        if !inner.is_object() {
            return Err(Error::Validation("payload is not a JSON object".into()));
        }
        serde_json::from_value(inner.clone()).map_err(Error::from)
    }

    /// Whether this event carries a new inbound message
    #[must_use]
    pub fn is_message_upsert(&self) -> bool {
        self.event.as_deref() == Some("messages.upsert")
    }
}

/// Strip the gateway JID suffix, leaving the bare phone number
#[must_use]
pub fn phone_from_jid(jid: &str) -> String {
    jid.trim_end_matches(JID_SUFFIX).to_string()
}

/// Append the gateway JID suffix to a bare phone number
#[must_use]
pub fn jid_from_phone(phone: &str) -> String {
    if phone.ends_with(JID_SUFFIX) {
        phone.to_string()
    } else {
        format!("{phone}{JID_SUFFIX}")
    }
}
