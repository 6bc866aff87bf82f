//! Configuration for the Atende gateway
//!
//! Loaded once at process start from environment variables and passed by
//! reference into the pipeline; nodes never reach out to ambient state.

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat gateway (Evolution API) base URL
    pub gateway_url: String,

    /// Chat gateway API key
    pub gateway_api_key: String,

    /// Chat gateway instance name
    pub gateway_instance: String,

    /// The bot's own phone number, used to drop self-originated events
    pub bot_phone_number: String,

    /// `OpenAI` API key (chat, Whisper, vision)
    pub openai_api_key: String,

    /// Chat completion model identifier
    pub chat_model: String,

    /// Speech-to-text model identifier
    pub stt_model: String,

    /// Expected spoken language for transcription (ISO 639-1)
    pub stt_language: String,

    /// Model-call deadline in seconds; exceeding it degrades the reply
    pub agent_timeout_secs: u64,

    /// History turns prepended to the agent context
    pub history_turns: usize,

    /// Maximum characters per reply fragment
    pub max_fragment_size: usize,

    /// Pause after the typing cue before sending a fragment
    pub typing_pause: Duration,

    /// Pause between send attempts of one fragment
    pub send_retry_pause: Duration,

    /// Pause between fragments (not after the last)
    pub inter_message_delay: Duration,

    /// Phone number of the on-call technician for handoffs
    pub technician_phone: String,

    /// Path to the `SQLite` database
    pub db_path: PathBuf,

    /// HTTP port for the webhook endpoint
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when a required variable is missing or blank.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            gateway_url: required("ATENDE_GATEWAY_URL")?,
            gateway_api_key: required("ATENDE_GATEWAY_API_KEY")?,
            gateway_instance: required("ATENDE_GATEWAY_INSTANCE")?,
            bot_phone_number: required("ATENDE_BOT_PHONE")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            chat_model: optional("ATENDE_CHAT_MODEL", "gpt-4o"),
            stt_model: optional("ATENDE_STT_MODEL", "whisper-1"),
            stt_language: optional("ATENDE_STT_LANGUAGE", "pt"),
            agent_timeout_secs: parse_or("ATENDE_AGENT_TIMEOUT", 60)?,
            history_turns: parse_or("ATENDE_HISTORY_TURNS", 6)?,
            max_fragment_size: parse_or("ATENDE_MAX_FRAGMENT_SIZE", 300)?,
            typing_pause: Duration::from_millis(500),
            send_retry_pause: Duration::from_secs(2),
            inter_message_delay: Duration::from_millis(1500),
            technician_phone: optional("ATENDE_TECHNICIAN_PHONE", ""),
            db_path: PathBuf::from(optional("ATENDE_DB_PATH", "atende.db")),
            port: parse_or("ATENDE_PORT", 8000)?,
        })
    }
}

fn required(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("{name} is required"))),
    }
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|_| Error::Config(format!("{name} is not a valid number: {v}"))),
        Err(_) => Ok(default),
    }
}
