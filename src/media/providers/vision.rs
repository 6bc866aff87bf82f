//! Vision description provider
//!
//! Asks a multimodal chat model to describe an inbound image in the
//! customer's own voice, so the description can stand in for the message
//! text downstream.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::VisionDescriber;
use crate::{Error, Result};

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// The model answers as if it were the customer describing their own image.
const DESCRIBE_PROMPT: &str = "O que há nessa imagem? Me dê a resposta como se \
fosse um cliente descrevendo a imagem. Comece dizendo: \"te enviei uma imagem \
que...\" Sempre em primeira pessoa, como se você fosse o cliente. Ao invés de \
dizer 'você me enviou', diga 'eu te enviei'. Seja detalhado e útil na \
descrição, mas mantenha o tom natural de um cliente conversando via WhatsApp.";

/// OpenAI multimodal chat client
pub struct OpenAiVision {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiVision {
    #[must_use]
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl VisionDescriber for OpenAiVision {
    async fn describe(&self, base64_image: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": DESCRIBE_PROMPT},
                    {"type": "image_url", "image_url": {
                        "url": format!("data:image/jpeg;base64,{base64_image}"),
                    }},
                ],
            }],
        });

        let response = self
            .http
            .post(CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(Error::Transient(format!("vision call returned {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Media(format!("vision call failed: {status}: {detail}")));
        }

        let payload: Value = response.json().await?;
        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Media("vision response carried no description".into()))
    }
}
