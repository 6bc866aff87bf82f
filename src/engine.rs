//! Workflow engine
//!
//! Drives one inbound event through the pipeline: validate, resolve the
//! customer, normalize the media, generate a reply, fragment it, deliver
//! it. Nodes never return errors to the engine; each one either sets a
//! valid successor or records its error and routes to terminal, so the
//! dispatch loop below has no error arm at all.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::agent;
use crate::config::Config;
use crate::db::{CustomerRepo, HistoryRepo, NewCustomer};
use crate::delivery::{self, DeliveryPacing};
use crate::fragment::fragment;
use crate::gateway::ChatGateway;
use crate::llm::ChatModel;
use crate::media::{self, providers::Transcriber, providers::VisionDescriber, MediaBranch};
use crate::serialize::CustomerLocks;
use crate::state::{MessageKind, NextAction, PipelineState};
use crate::webhook::{phone_from_jid, EventData, WebhookEvent};

/// Passes through the lookup node before the register cycle is declared stuck
const MAX_LOOKUP_PASSES: u32 = 2;

/// Everything a pipeline run needs, wired once at bootstrap
#[derive(Clone)]
pub struct PipelineDeps {
    pub config: Config,
    pub gateway: Arc<dyn ChatGateway>,
    pub model: Arc<dyn ChatModel>,
    pub transcriber: Arc<dyn Transcriber>,
    pub vision: Arc<dyn VisionDescriber>,
    pub customers: CustomerRepo,
    pub history: HistoryRepo,
    pub tools: crate::tools::ToolRegistry,
    pub locks: CustomerLocks,
}

/// Run one event through the pipeline to completion.
///
/// Events from the same customer are serialized behind a per-phone lease;
/// the returned state is terminal.
pub async fn run_pipeline(deps: &PipelineDeps, raw_event: Value) -> PipelineState {
    let _lease = match peek_phone(&raw_event) {
        Some(phone) => Some(deps.locks.acquire(&phone).await),
        None => None,
    };

    let mut state = PipelineState::new(raw_event);
    validate(&mut state, deps).await;

    loop {
        match state.next_action {
            NextAction::LookupCustomer => lookup_customer(&mut state, deps),
            NextAction::RegisterCustomer => register_customer(&mut state, deps),
            NextAction::RouteMedia => route_media(&mut state, deps).await,
            NextAction::GenerateResponse => {
                agent::generate_response(
                    &mut state,
                    deps.model.as_ref(),
                    &deps.tools,
                    &deps.history,
                    &deps.config,
                )
                .await;
            }
            NextAction::FragmentReply => fragment_reply(&mut state, &deps.config),
            NextAction::Deliver => {
                delivery::deliver(
                    &mut state,
                    deps.gateway.as_ref(),
                    DeliveryPacing::from_config(&deps.config),
                )
                .await;
            }
            NextAction::Terminal => break,
        }
    }

    if let Some(error) = &state.error {
        info!(customer = %state.customer_phone, error = %error, "pipeline finished with error");
    } else {
        debug!(customer = %state.customer_phone, "pipeline finished");
    }
    state
}

/// Customer phone straight off the raw payload, for the lease
fn peek_phone(raw_event: &Value) -> Option<String> {
    let event = WebhookEvent::parse(raw_event).ok()?;
    let jid = event.data?.key?.remote_jid?;
    Some(phone_from_jid(&jid))
}

async fn validate(state: &mut PipelineState, deps: &PipelineDeps) {
    let event = match WebhookEvent::parse(&state.raw_event) {
        Ok(event) => event,
        Err(e) => return state.fail(format!("invalid payload: {e}")),
    };
    if !event.is_message_upsert() {
        return state.fail(format!(
            "ignoring event kind: {}",
            event.event.as_deref().unwrap_or("<none>")
        ));
    }
    let Some(data) = event.data else {
        return state.fail("event carries no data");
    };
    let Some(key) = &data.key else {
        return state.fail("event carries no message key");
    };
    let Some(jid) = &key.remote_jid else {
        return state.fail("event carries no sender");
    };

    let phone = phone_from_jid(jid);
    if key.from_me || phone == deps.config.bot_phone_number {
        return state.fail("dropping self-originated message");
    }

    let kind = MessageKind::from_type_str(data.message_type.as_deref().unwrap_or(""));
    state.customer_phone = phone;
    state.customer_display_name = data.push_name.clone().unwrap_or_default();
    state.message_kind = kind;
    state.message_id = key.id.clone().unwrap_or_default();
    state.message_timestamp = data.message_timestamp;
    state.from_self = key.from_me;
    state.raw_content = extract_content(&data, kind);

    // Read receipt is cosmetic; a failure must not stop the pipeline
    if !state.message_id.is_empty() {
        if let Err(e) = deps
            .gateway
            .mark_as_read(&state.customer_phone, &state.message_id)
            .await
        {
            warn!(error = %e, "mark-as-read failed");
        }
    }

    state.next_action = NextAction::LookupCustomer;
}

fn extract_content(data: &EventData, kind: MessageKind) -> Value {
    match kind {
        MessageKind::Text => data
            .message
            .get("conversation")
            .cloned()
            .or_else(|| data.message.pointer("/extendedTextMessage/text").cloned())
            .unwrap_or(Value::Null),
        other => data
            .message
            .get(other.payload_key())
            .cloned()
            .unwrap_or(Value::Null),
    }
}

fn lookup_customer(state: &mut PipelineState, deps: &PipelineDeps) {
    state.lookup_passes += 1;
    if state.lookup_passes > MAX_LOOKUP_PASSES {
        return state.fail("customer registration did not converge");
    }

    match deps.customers.find(&state.customer_phone) {
        Ok(Some(record)) => {
            debug!(customer = %state.customer_phone, "customer found");
            if state.customer_display_name.trim().is_empty() {
                state.customer_display_name = record.display_name.clone();
            }
            state.customer_id = Some(record.id);
            state.customer_known = true;
            state.next_action = NextAction::RouteMedia;
        }
        Ok(None) => {
            info!(customer = %state.customer_phone, "new customer, registering");
            state.customer_known = false;
            state.next_action = NextAction::RegisterCustomer;
        }
        Err(e) => state.fail(format!("customer lookup failed: {e}")),
    }
}

fn register_customer(state: &mut PipelineState, deps: &PipelineDeps) {
    let display_name = if state.customer_display_name.trim().is_empty() {
        "Cliente".to_string()
    } else {
        state.customer_display_name.clone()
    };
    let first_message = match &state.raw_content {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let new = NewCustomer {
        phone: state.customer_phone.clone(),
        display_name,
        first_message,
        first_message_kind: format!("{:?}", state.message_kind).to_lowercase(),
    };
    match deps.customers.insert(&new) {
        Ok(record) => {
            info!(customer = %record.phone, "customer registered");
            // Back through lookup so the stored record is what the rest
            // of the pipeline works with
            state.next_action = NextAction::LookupCustomer;
        }
        Err(e) => state.fail(format!("customer registration failed: {e}")),
    }
}

async fn route_media(state: &mut PipelineState, deps: &PipelineDeps) {
    match media::route(state.message_kind) {
        MediaBranch::Audio => {
            media::resolve_audio(state, deps.gateway.as_ref(), deps.transcriber.as_ref()).await;
        }
        MediaBranch::Image => {
            media::resolve_image(state, deps.gateway.as_ref(), deps.vision.as_ref()).await;
        }
        MediaBranch::Text => media::resolve_text(state),
    }
}

fn fragment_reply(state: &mut PipelineState, config: &Config) {
    let fragments = fragment(&state.generated_reply, config.max_fragment_size);
    if fragments.is_empty() {
        return state.fail("generated reply fragmented to nothing");
    }
    debug!(count = fragments.len(), "reply fragmented");
    state.reply_fragments = fragments;
    state.next_action = NextAction::Deliver;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn peek_phone_reads_the_sender_jid() {
        let raw = json!({
            "event": "messages.upsert",
            "data": {"key": {"remoteJid": "5511999990000@s.whatsapp.net", "id": "A"}}
        });
        assert_eq!(peek_phone(&raw).as_deref(), Some("5511999990000"));
        assert_eq!(peek_phone(&json!({"event": "x"})), None);
    }

    #[test]
    fn extract_content_handles_both_text_shapes() {
        let data: EventData = serde_json::from_value(json!({
            "messageType": "conversation",
            "message": {"conversation": "oi"}
        }))
        .unwrap();
        assert_eq!(extract_content(&data, MessageKind::Text), json!("oi"));

        let data: EventData = serde_json::from_value(json!({
            "messageType": "extendedTextMessage",
            "message": {"extendedTextMessage": {"text": "olá"}}
        }))
        .unwrap();
        assert_eq!(extract_content(&data, MessageKind::Text), json!("olá"));
    }

    #[test]
    fn extract_content_returns_media_subobject() {
        let data: EventData = serde_json::from_value(json!({
            "messageType": "audioMessage",
            "message": {"audioMessage": {"seconds": 12}}
        }))
        .unwrap();
        assert_eq!(
            extract_content(&data, MessageKind::Audio),
            json!({"seconds": 12})
        );
    }
}
