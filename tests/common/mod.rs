//! Shared fixtures for pipeline tests

use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use atende_gateway::db::{self, CustomerRepo, HistoryRepo};
use atende_gateway::gateway::ChatGateway;
use atende_gateway::llm::{ChatModel, ChatOutcome, ChatRequest};
use atende_gateway::media::providers::{Transcriber, VisionDescriber};
use atende_gateway::serialize::CustomerLocks;
use atende_gateway::tools::ToolRegistry;
use atende_gateway::{Config, Error, PipelineDeps, Result};

/// What the mock gateway should say when media is fetched by id
#[derive(Clone)]
pub enum MediaScript {
    Unavailable,
    Expired,
    Base64(String),
}

/// Gateway double that records all outbound traffic
pub struct MockGateway {
    pub sent: Mutex<Vec<(String, String)>>,
    pub typing_cues: AtomicUsize,
    pub media: Mutex<MediaScript>,
}

impl MockGateway {
    pub fn new(media: MediaScript) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            typing_cues: AtomicUsize::new(0),
            media: Mutex::new(media),
        }
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn send_text(&self, phone: &str, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push((phone.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_typing(&self, _phone: &str) -> Result<()> {
        self.typing_cues.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn send_available(&self, _phone: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_media_base64(&self, _message_id: &str) -> Result<String> {
        match &*self.media.lock().unwrap() {
            MediaScript::Unavailable => Err(Error::Media("no media stored".into())),
            MediaScript::Expired => Err(Error::ResourceExpired("media gone".into())),
            MediaScript::Base64(data) => Ok(data.clone()),
        }
    }

    async fn mark_as_read(&self, _phone: &str, _message_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Model double that answers every prompt with a fixed reply
pub struct MockModel {
    pub reply: String,
    pub inputs: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            inputs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatOutcome> {
        let input = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.inputs.lock().unwrap().push(input);
        Ok(ChatOutcome {
            text: Some(self.reply.clone()),
            tool_calls: vec![],
        })
    }
}

pub struct StubTranscriber(pub &'static str);

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _path: &std::path::Path) -> Result<String> {
        Ok(self.0.to_string())
    }
}

pub struct StubVision(pub &'static str);

#[async_trait]
impl VisionDescriber for StubVision {
    async fn describe(&self, _base64_image: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

pub fn test_config() -> Config {
    Config {
        gateway_url: "http://localhost:9999".into(),
        gateway_api_key: "test-key".into(),
        gateway_instance: "test".into(),
        bot_phone_number: "5500000000000".into(),
        openai_api_key: "test-key".into(),
        chat_model: "test-model".into(),
        stt_model: "whisper-1".into(),
        stt_language: "pt".into(),
        agent_timeout_secs: 5,
        history_turns: 6,
        max_fragment_size: 300,
        typing_pause: Duration::ZERO,
        send_retry_pause: Duration::ZERO,
        inter_message_delay: Duration::ZERO,
        technician_phone: "5562000000000".into(),
        db_path: PathBuf::from(":memory:"),
        port: 0,
    }
}

/// Wire a full dependency set around the given doubles
pub fn build_deps(gateway: Arc<MockGateway>, model: Arc<MockModel>) -> PipelineDeps {
    let pool = db::init_memory().expect("in-memory db");
    PipelineDeps {
        config: test_config(),
        gateway,
        model,
        transcriber: Arc::new(StubTranscriber("transcrição do áudio")),
        vision: Arc::new(StubVision("te enviei uma imagem que mostra uma parede")),
        customers: CustomerRepo::new(pool.clone()),
        history: HistoryRepo::new(pool),
        tools: ToolRegistry::new(),
        locks: CustomerLocks::new(),
    }
}

pub const CUSTOMER_JID: &str = "5511999990000@s.whatsapp.net";
pub const CUSTOMER_PHONE: &str = "5511999990000";

/// An inbound text event the way the gateway posts it
pub fn text_event(text: &str) -> Value {
    json!({
        "event": "messages.upsert",
        "instance": "test",
        "data": {
            "key": {"remoteJid": CUSTOMER_JID, "fromMe": false, "id": "MSG-1"},
            "pushName": "Maria",
            "messageType": "conversation",
            "messageTimestamp": 1_700_000_000,
            "message": {"conversation": text}
        }
    })
}

/// An audio event without inline media, forcing the gateway fetch path
pub fn audio_event_without_media() -> Value {
    json!({
        "event": "messages.upsert",
        "instance": "test",
        "data": {
            "key": {"remoteJid": CUSTOMER_JID, "fromMe": false, "id": "MSG-AUDIO"},
            "pushName": "Maria",
            "messageType": "audioMessage",
            "messageTimestamp": 1_700_000_000,
            "message": {"audioMessage": {"seconds": 7}}
        }
    })
}
