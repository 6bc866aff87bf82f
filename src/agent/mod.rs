//! Response generation
//!
//! The agent binds the system prompt to the real customer, prepends recent
//! history, and drives the model through a bounded tool loop. Whatever
//! happens inside — tool failures, model errors, timeouts — the node always
//! leaves a non-empty `generated_reply` and routes to fragmentation, so the
//! customer receives some answer.

mod postprocess;
mod prompt;

pub use postprocess::clean_reply;
pub use prompt::{compose_input, system_prompt};

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::HistoryRepo;
use crate::llm::{ChatMessage, ChatModel, ChatRequest};
use crate::state::{NextAction, PipelineState, Role};
use crate::tools::ToolRegistry;

/// Model invocations per message, tool round-trips included
pub const MAX_MODEL_CALLS: usize = 3;

fn technical_apology(customer_name: &str) -> String {
    format!(
        "Oi {customer_name}! 😊\n\nDesculpe, estou com um problema técnico no \
         momento. Pode tentar novamente em alguns segundos?"
    )
}

fn queued_fallback(queued: &[Value]) -> String {
    queued
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            let content = match msg {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            format!("[Mensagem {}]: {content}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Generate a reply for the resolved message
pub async fn generate_response(
    state: &mut PipelineState,
    model: &dyn ChatModel,
    tools: &ToolRegistry,
    history: &HistoryRepo,
    config: &Config,
) {
    let current = if state.normalized_text.trim().is_empty() {
        queued_fallback(&state.queued_messages)
    } else {
        state.normalized_text.clone()
    };
    if current.trim().is_empty() {
        state.fail("no message content to process");
        return;
    }

    let customer_name = if state.customer_display_name.trim().is_empty() {
        "Cliente".to_string()
    } else {
        state.customer_display_name.clone()
    };

    let turns = match history.recent(&state.customer_phone, config.history_turns) {
        Ok(turns) => turns,
        Err(e) => {
            warn!(error = %e, "history unavailable, continuing without it");
            Vec::new()
        }
    };

    let system = system_prompt(&customer_name, &state.customer_phone, Utc::now());
    let mut input = compose_input(&turns, &current);
    let deadline = Duration::from_secs(config.agent_timeout_secs);

    let mut reply: Option<String> = None;
    for iteration in 1..=MAX_MODEL_CALLS {
        let request = ChatRequest {
            model: config.chat_model.clone(),
            messages: vec![
                ChatMessage::system(system.clone()),
                ChatMessage::user(input.clone()),
            ],
            tools: tools.specs(),
        };

        let outcome = match tokio::time::timeout(deadline, model.complete(&request)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(error = %e, iteration, "model call failed, degrading reply");
                state.error = Some(e.to_string());
                reply = None;
                break;
            }
            Err(_) => {
                warn!(
                    timeout_secs = config.agent_timeout_secs,
                    iteration, "model call timed out, degrading reply"
                );
                state.error = Some(format!(
                    "model call timed out after {}s",
                    config.agent_timeout_secs
                ));
                reply = None;
                break;
            }
        };

        if outcome.tool_calls.is_empty() {
            reply = outcome.text;
            break;
        }

        info!(
            iteration,
            requested = outcome.tool_calls.len(),
            "model requested tool calls"
        );
        for call in &outcome.tool_calls {
            match tools.execute(&call.name, call.arguments.clone()).await {
                Ok(result) => {
                    info!(tool = %call.name, "tool executed");
                    input.push_str(&format!("\n\n[Resultado de {}]: {result}", call.name));
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "tool failed, feeding error back");
                    input.push_str(&format!("\n\n[Erro em {}]: {e}", call.name));
                }
            }
        }
        // Hold on to any partial text in case the iteration cap is hit
        reply = outcome.text.or(reply);
    }

    let reply = reply
        .map(|text| clean_reply(&text))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| technical_apology(&customer_name));

    if let Err(e) = history.append(&state.customer_phone, Role::Customer, &current) {
        warn!(error = %e, "failed to persist customer turn");
    }
    if let Err(e) = history.append(&state.customer_phone, Role::Assistant, &reply) {
        warn!(error = %e, "failed to persist assistant turn");
    }

    state.generated_reply = reply;
    state.next_action = NextAction::FragmentReply;
}
