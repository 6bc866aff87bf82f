//! Media routing and resolution
//!
//! The router is a pure, total function over message kinds. The resolvers
//! turn whatever the customer sent into `normalized_text`: a verbatim copy
//! for text, a transcript for audio, a first-person description for images.
//! Resolution never fails the pipeline; when a media payload cannot be
//! obtained the resolver writes a localized apology into the state and the
//! flow continues to response generation with that apology as the input.

pub mod providers;

use std::io::Write;

use base64::Engine as _;
use serde_json::Value;
use tracing::{info, warn};

use crate::gateway::ChatGateway;
use crate::state::{MessageKind, NextAction, PipelineState};
use crate::{Error, Result};
use providers::{Transcriber, VisionDescriber};

/// Processing branch selected by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaBranch {
    Audio,
    Image,
    Text,
}

/// Map a message kind to its processing branch.
///
/// Total over every kind: anything that is not audio or image flows through
/// the text branch, so an unrecognized kind degrades instead of dead-ending.
#[must_use]
pub const fn route(kind: MessageKind) -> MediaBranch {
    match kind {
        MessageKind::Audio => MediaBranch::Audio,
        MessageKind::Image => MediaBranch::Image,
        MessageKind::Text
        | MessageKind::Video
        | MessageKind::Document
        | MessageKind::Sticker
        | MessageKind::Other => MediaBranch::Text,
    }
}

const AUDIO_EXPIRED_APOLOGY: &str = "Oi! Parece que você enviou um áudio, mas \
ele expirou antes de eu conseguir processar. Por favor, envie novamente ou \
escreva sua mensagem em texto. Obrigado!";

const AUDIO_FAILED_APOLOGY: &str = "Desculpe, não consegui processar o áudio \
no momento. Pode tentar enviar novamente ou escrever em texto?";

const IMAGE_FAILED_APOLOGY: &str = "Desculpe, não consegui processar a \
imagem. Pode descrever o que precisa?";

/// Search the event for an inline base64 media payload.
///
/// Priority order: the kind-keyed object inside the message body (`media`
/// then `base64`), the message body itself, the event data object, and
/// finally the legacy `mediaData` field some gateway versions emit.
#[must_use]
pub fn extract_base64(raw_event: &Value, kind: MessageKind) -> Option<String> {
    let envelope = match raw_event.get("body") {
        Some(body) if body.is_object() => body,
        _ => raw_event,
    };
    let data = envelope.get("data")?;
    let message = data.get("message").unwrap_or(&Value::Null);

    let field_of = |obj: &Value| {
        obj.get("media")
            .or_else(|| obj.get("base64"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    if let Some(found) = message.get(kind.payload_key()).and_then(|o| field_of(o)) {
        return Some(found);
    }
    if let Some(found) = field_of(message) {
        return Some(found);
    }
    if let Some(found) = field_of(data) {
        return Some(found);
    }
    data.get("mediaData")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn degrade(state: &mut PipelineState, apology: &str, detail: String) {
    warn!(error = %detail, "media resolution degraded to apology");
    state.transcribed_text = Some(apology.to_string());
    state.normalized_text = apology.to_string();
    state.error = Some(detail);
    state.next_action = NextAction::GenerateResponse;
}

fn finish(state: &mut PipelineState, text: String) {
    state.transcribed_text = Some(text.clone());
    state.normalized_text = text;
    state.next_action = NextAction::GenerateResponse;
}

/// Inline payload, or fetch by message id as a fallback
async fn obtain_base64(state: &PipelineState, gateway: &dyn ChatGateway) -> Result<String> {
    if let Some(inline) = extract_base64(&state.raw_event, state.message_kind) {
        return Ok(inline);
    }
    if state.message_id.is_empty() {
        return Err(Error::Media(
            "no inline media and no message id to fetch by".into(),
        ));
    }
    info!(message_id = %state.message_id, "no inline media, fetching from gateway");
    gateway.fetch_media_base64(&state.message_id).await
}

/// Resolve an audio message into a transcript
pub async fn resolve_audio(
    state: &mut PipelineState,
    gateway: &dyn ChatGateway,
    transcriber: &dyn Transcriber,
) {
    let encoded = match obtain_base64(state, gateway).await {
        Ok(encoded) => encoded,
        Err(e @ Error::ResourceExpired(_)) => {
            return degrade(state, AUDIO_EXPIRED_APOLOGY, e.to_string());
        }
        Err(e) => return degrade(state, AUDIO_FAILED_APOLOGY, e.to_string()),
    };

    let transcript = async {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::Media(format!("audio payload is not valid base64: {e}")))?;
        // NamedTempFile removes itself on drop, success or failure
        let mut file = tempfile::Builder::new().suffix(".ogg").tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;
        transcriber.transcribe(file.path()).await
    }
    .await;

    match transcript {
        Ok(text) => {
            info!(chars = text.len(), "audio transcribed");
            finish(state, text);
        }
        Err(e) => degrade(state, AUDIO_FAILED_APOLOGY, e.to_string()),
    }
}

/// Resolve an image message into a first-person description
pub async fn resolve_image(
    state: &mut PipelineState,
    gateway: &dyn ChatGateway,
    vision: &dyn VisionDescriber,
) {
    let encoded = match obtain_base64(state, gateway).await {
        Ok(encoded) => encoded,
        Err(e) => return degrade(state, IMAGE_FAILED_APOLOGY, e.to_string()),
    };

    match vision.describe(&encoded).await {
        Ok(description) => {
            info!(chars = description.len(), "image described");
            finish(state, description);
        }
        Err(e) => degrade(state, IMAGE_FAILED_APOLOGY, e.to_string()),
    }
}

/// Resolve a text message: verbatim copy, stringified when structured
pub fn resolve_text(state: &mut PipelineState) {
    let content = match &state.raw_content {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    finish(state, content);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn router_is_total_and_defaults_to_text() {
        assert_eq!(route(MessageKind::Audio), MediaBranch::Audio);
        assert_eq!(route(MessageKind::Image), MediaBranch::Image);
        assert_eq!(route(MessageKind::Text), MediaBranch::Text);
        assert_eq!(route(MessageKind::Video), MediaBranch::Text);
        assert_eq!(route(MessageKind::Document), MediaBranch::Text);
        assert_eq!(route(MessageKind::Sticker), MediaBranch::Text);
        assert_eq!(route(MessageKind::Other), MediaBranch::Text);
    }

    #[test]
    fn extracts_from_kind_keyed_object_first() {
        let event = json!({
            "data": {
                "media": "outer",
                "message": {
                    "media": "middle",
                    "audioMessage": {"media": "inner", "mimetype": "audio/ogg"},
                },
            }
        });
        assert_eq!(
            extract_base64(&event, MessageKind::Audio).as_deref(),
            Some("inner")
        );
    }

    #[test]
    fn falls_back_through_message_then_data() {
        let event = json!({
            "data": {
                "base64": "outer",
                "message": {"base64": "middle", "audioMessage": {}},
            }
        });
        assert_eq!(
            extract_base64(&event, MessageKind::Audio).as_deref(),
            Some("middle")
        );

        let event = json!({
            "data": {"base64": "outer", "message": {"audioMessage": {}}}
        });
        assert_eq!(
            extract_base64(&event, MessageKind::Audio).as_deref(),
            Some("outer")
        );
    }

    #[test]
    fn legacy_media_data_is_last_resort() {
        let event = json!({
            "data": {"mediaData": "legacy", "message": {}}
        });
        assert_eq!(
            extract_base64(&event, MessageKind::Image).as_deref(),
            Some("legacy")
        );
    }

    #[test]
    fn unwraps_body_envelope_when_present() {
        let event = json!({
            "body": {"data": {"message": {"imageMessage": {"base64": "wrapped"}}}}
        });
        assert_eq!(
            extract_base64(&event, MessageKind::Image).as_deref(),
            Some("wrapped")
        );
    }

    #[test]
    fn missing_media_yields_none() {
        let event = json!({"data": {"message": {"audioMessage": {}}}});
        assert_eq!(extract_base64(&event, MessageKind::Audio), None);
    }

    #[test]
    fn text_resolution_copies_verbatim() {
        let mut state = PipelineState::new(Value::Null);
        state.raw_content = json!("Quanto custa a instalação?");
        resolve_text(&mut state);
        assert_eq!(state.normalized_text, "Quanto custa a instalação?");
        assert_eq!(
            state.transcribed_text.as_deref(),
            Some("Quanto custa a instalação?")
        );
        assert_eq!(state.next_action, NextAction::GenerateResponse);
    }

    #[test]
    fn structured_text_content_is_stringified() {
        let mut state = PipelineState::new(Value::Null);
        state.raw_content = json!({"caption": "olha isso"});
        resolve_text(&mut state);
        assert!(state.normalized_text.contains("olha isso"));
    }
}
