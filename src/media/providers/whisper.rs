//! Whisper speech-to-text provider

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart;
use serde_json::Value;
use tracing::debug;

use super::Transcriber;
use crate::{Error, Result};

const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// OpenAI Whisper client
pub struct WhisperTranscriber {
    http: reqwest::Client,
    api_key: String,
    model: String,
    language: String,
}

impl WhisperTranscriber {
    #[must_use]
    pub fn new(api_key: &str, model: &str, language: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        debug!(bytes = bytes.len(), "submitting audio for transcription");

        let file_name = path
            .file_name()
            .map_or_else(|| "audio.ogg".to_string(), |n| n.to_string_lossy().into_owned());
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/ogg")
            .map_err(|e| Error::Media(format!("invalid audio mime type: {e}")))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        let response = self
            .http
            .post(TRANSCRIPTION_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(Error::Transient(format!("transcription returned {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Media(format!("transcription failed: {status}: {detail}")));
        }

        let payload: Value = response.json().await?;
        payload
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Media("transcription response carried no text".into()))
    }
}
