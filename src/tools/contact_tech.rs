//! Technician handoff tool
//!
//! Forwards an urgent request straight to the on-call technician over the
//! chat gateway. A failed notification turns into friendly fallback text
//! for the customer instead of an error, so the handoff attempt never
//! breaks the conversation.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use super::Tool;
use crate::gateway::ChatGateway;
use crate::{Error, Result};

pub struct ContactTechnician {
    gateway: Arc<dyn ChatGateway>,
    technician_phone: String,
}

impl ContactTechnician {
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>, technician_phone: &str) -> Self {
        Self {
            gateway,
            technician_phone: technician_phone.to_string(),
        }
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::Tool(format!("missing required argument: {key}")))
}

#[async_trait]
impl Tool for ContactTechnician {
    fn name(&self) -> &str {
        "contact_technician"
    }

    fn description(&self) -> &str {
        "Encaminha a solicitação do cliente diretamente ao técnico. Use quando \
         o cliente pedir para falar com o técnico, quando a situação for \
         urgente ou quando o problema for técnico demais para você resolver."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "customer_name": {"type": "string"},
                "customer_phone": {"type": "string"},
                "subject": {
                    "type": "string",
                    "description": "Motivo do contato, ex: 'orçamento urgente'"
                },
                "customer_message": {
                    "type": "string",
                    "description": "Mensagem ou contexto adicional do cliente"
                }
            },
            "required": ["customer_name", "customer_phone", "subject"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        if self.technician_phone.trim().is_empty() {
            return Err(Error::Tool("no technician phone configured".into()));
        }
        let name = required_str(&args, "customer_name")?;
        let phone = required_str(&args, "customer_phone")?;
        let subject = required_str(&args, "subject")?;
        let extra = args
            .get("customer_message")
            .and_then(Value::as_str)
            .unwrap_or("");

        let mut note = format!(
            "SOLICITAÇÃO DE CONTATO\n\nCliente: {name}\nTelefone: {phone}\nAssunto: {subject}"
        );
        if !extra.is_empty() {
            note.push_str(&format!("\n\nMensagem do cliente:\n{extra}"));
        }
        note.push_str("\n\nCliente solicitou falar com você. Entre em contato o mais breve possível!");

        match self.gateway.send_text(&self.technician_phone, &note).await {
            Ok(()) => {
                info!(customer = name, "handoff forwarded to technician");
                Ok(format!(
                    "Perfeito! Já encaminhei sua solicitação para nosso técnico. \
                     Ele entrará em contato com você no telefone {phone} o mais \
                     breve possível."
                ))
            }
            Err(e) => {
                warn!(error = %e, "technician notification failed");
                Ok("Desculpe, tive um problema ao encaminhar sua solicitação. \
                    Por favor, tente novamente em alguns minutos ou ligue \
                    diretamente para nosso técnico."
                    .into())
            }
        }
    }
}
