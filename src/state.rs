//! Shared pipeline state and flow-control types
//!
//! One `PipelineState` is created per inbound webhook event, threaded
//! mutably through every node, and discarded after the terminal node.

use serde_json::Value;

use crate::delivery::DeliveryStats;

/// Message kinds carried by the chat platform.
///
/// Variant names map to the gateway's `messageType` discriminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    Text,
    Audio,
    Image,
    Video,
    Document,
    Sticker,
    #[default]
    Other,
}

impl MessageKind {
    /// Parse the gateway's `messageType` string; unknown types map to `Other`.
    #[must_use]
    pub fn from_type_str(kind: &str) -> Self {
        match kind {
            "conversation" | "extendedTextMessage" => Self::Text,
            "audioMessage" => Self::Audio,
            "imageMessage" => Self::Image,
            "videoMessage" => Self::Video,
            "documentMessage" => Self::Document,
            "stickerMessage" => Self::Sticker,
            _ => Self::Other,
        }
    }

    /// The key under `data.message` holding this kind's sub-object.
    #[must_use]
    pub const fn payload_key(self) -> &'static str {
        match self {
            Self::Text => "conversation",
            Self::Audio => "audioMessage",
            Self::Image => "imageMessage",
            Self::Video => "videoMessage",
            Self::Document => "documentMessage",
            Self::Sticker => "stickerMessage",
            Self::Other => "message",
        }
    }
}

/// Successor selected by a node on exit.
///
/// A closed enum rather than an ad hoc string: the engine's edge tables
/// match exhaustively on it, so an unhandled action is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NextAction {
    LookupCustomer,
    RegisterCustomer,
    RouteMedia,
    GenerateResponse,
    FragmentReply,
    Deliver,
    #[default]
    Terminal,
}

/// A single persisted conversation turn
#[derive(Debug, Clone)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

/// Speaker of a history turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Assistant => "assistant",
        }
    }
}

/// Mutable state shared by every pipeline node
#[derive(Debug, Default)]
pub struct PipelineState {
    /// Opaque inbound payload as received from the platform
    pub raw_event: Value,

    /// Customer phone number (JID suffix stripped)
    pub customer_phone: String,
    /// Display name from the event (`pushName`)
    pub customer_display_name: String,
    /// Store ID once resolved
    pub customer_id: Option<String>,
    /// Whether the customer record exists in the directory
    pub customer_known: bool,

    pub message_kind: MessageKind,
    pub message_id: String,
    pub message_timestamp: Option<i64>,
    /// Whether the bot itself authored the message
    pub from_self: bool,

    /// Raw message content: a string for text, a media sub-object otherwise
    pub raw_content: Value,
    /// Legacy twin of `normalized_text`, kept in step by every resolver
    pub transcribed_text: Option<String>,
    /// The only field the response generator reads
    pub normalized_text: String,
    /// Grouped raw messages; fallback input when `normalized_text` is absent
    pub queued_messages: Vec<Value>,

    /// Full reply produced by the response generator
    pub generated_reply: String,
    /// Reply split into channel-sized chunks, in send order
    pub reply_fragments: Vec<String>,

    /// Successor selected by the last node to run
    pub next_action: NextAction,
    /// Passes through the lookup node; bounds the register→lookup cycle
    pub lookup_passes: u32,

    pub error: Option<String>,
    pub error_detail: Option<Value>,

    /// Filled by the delivery scheduler
    pub delivery_stats: Option<DeliveryStats>,
}

impl PipelineState {
    /// Create a fresh state for one inbound event
    #[must_use]
    pub fn new(raw_event: Value) -> Self {
        Self {
            raw_event,
            ..Self::default()
        }
    }

    /// Record an error and route to terminal
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.next_action = NextAction::Terminal;
    }
}
