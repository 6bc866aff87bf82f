//! Sequenced fragment delivery
//!
//! Sends fragments one at a time with a typing cue before each, a short
//! pause so the cue is visible, bounded retries per fragment, and a natural
//! delay between fragments. A fragment that exhausts its attempts is
//! counted and skipped; later fragments are still sent.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::gateway::ChatGateway;
use crate::state::{NextAction, PipelineState};

/// Send attempts per fragment
pub const MAX_SEND_ATTEMPTS: u32 = 3;

/// Pauses applied during delivery; tests zero them out
#[derive(Debug, Clone, Copy)]
pub struct DeliveryPacing {
    /// After the typing cue, before the send
    pub typing_pause: Duration,
    /// Between send attempts of one fragment
    pub send_retry_pause: Duration,
    /// Between fragments, skipped after the last
    pub inter_message_delay: Duration,
}

impl DeliveryPacing {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            typing_pause: config.typing_pause,
            send_retry_pause: config.send_retry_pause,
            inter_message_delay: config.inter_message_delay,
        }
    }

    /// No pauses at all, for tests
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            typing_pause: Duration::ZERO,
            send_retry_pause: Duration::ZERO,
            inter_message_delay: Duration::ZERO,
        }
    }
}

/// Outcome of one delivery run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl DeliveryStats {
    /// Share of fragments delivered, as a percentage
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64 * 100.0
        }
    }
}

/// Normalize line endings and tabs before handing text to the gateway
#[must_use]
pub fn clean_message(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").replace('\t', " ")
}

/// Deliver every fragment in `state.reply_fragments` in order
pub async fn deliver(state: &mut PipelineState, gateway: &dyn ChatGateway, pacing: DeliveryPacing) {
    if state.reply_fragments.is_empty() {
        state.fail("no fragments to deliver");
        return;
    }

    let started = Instant::now();
    let total = state.reply_fragments.len();
    let phone = state.customer_phone.clone();
    let mut succeeded = 0;
    let mut failed = 0;

    for (index, fragment) in state.reply_fragments.iter().enumerate() {
        debug!(fragment = index + 1, total, chars = fragment.len(), "delivering fragment");

        // Best effort: a missing typing cue is not worth a retry
        if let Err(e) = gateway.send_typing(&phone).await {
            warn!(error = %e, "typing cue failed");
        }
        tokio::time::sleep(pacing.typing_pause).await;

        let message = clean_message(fragment);
        let mut sent = false;
        for attempt in 1..=MAX_SEND_ATTEMPTS {
            match gateway.send_text(&phone, &message).await {
                Ok(()) => {
                    info!(fragment = index + 1, attempt, "fragment sent");
                    sent = true;
                    break;
                }
                Err(e) => {
                    warn!(fragment = index + 1, attempt, error = %e, "send failed");
                    if attempt < MAX_SEND_ATTEMPTS {
                        tokio::time::sleep(pacing.send_retry_pause).await;
                    }
                }
            }
        }

        if sent {
            succeeded += 1;
        } else {
            error!(fragment = index + 1, "fragment dropped after {MAX_SEND_ATTEMPTS} attempts");
            failed += 1;
        }

        if index + 1 < total {
            tokio::time::sleep(pacing.inter_message_delay).await;
        }
    }

    let stats = DeliveryStats {
        total,
        succeeded,
        failed,
        elapsed: started.elapsed(),
    };
    info!(
        total = stats.total,
        succeeded = stats.succeeded,
        failed = stats.failed,
        success_rate = stats.success_rate(),
        "delivery finished"
    );
    state.delivery_stats = Some(stats);
    state.next_action = NextAction::Terminal;
}
