//! Visit scheduling tool
//!
//! Drives the external calendar through the `CalendarService` boundary;
//! the calendar vendor's API lives behind that trait and is out of scope
//! here.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::Tool;
use crate::{Error, Result};

/// What the customer wants from the calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingIntent {
    Consult,
    Book,
    Cancel,
}

impl BookingIntent {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "consult" | "consultar" => Ok(Self::Consult),
            "book" | "agendar" => Ok(Self::Book),
            "cancel" | "cancelar" => Ok(Self::Cancel),
            other => Err(Error::Tool(format!("unknown booking intent: {other}"))),
        }
    }
}

/// External calendar boundary
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Free visit slots on the given day, human-readable
    async fn available_slots(&self, date: DateTime<Utc>) -> Result<Vec<String>>;

    /// Book a visit; returns a confirmation line
    async fn book(
        &self,
        customer_name: &str,
        customer_phone: &str,
        start: DateTime<Utc>,
        notes: &str,
    ) -> Result<String>;

    /// Cancel a customer's visit at the given time; returns a confirmation line
    async fn cancel(&self, customer_name: &str, start: DateTime<Utc>) -> Result<String>;
}

/// Tool the model calls to consult, book, or cancel a visit
pub struct ScheduleVisit {
    calendar: Arc<dyn CalendarService>,
}

impl ScheduleVisit {
    #[must_use]
    pub fn new(calendar: Arc<dyn CalendarService>) -> Self {
        Self { calendar }
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::Tool(format!("missing required argument: {key}")))
}

/// Accepts the date formats customers (and the model) actually produce
fn parse_when(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%d/%m/%Y %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&naive));
            }
        }
    }
    Err(Error::Tool(format!("unrecognized date format: {raw}")))
}

#[async_trait]
impl Tool for ScheduleVisit {
    fn name(&self) -> &str {
        "schedule_visit"
    }

    fn description(&self) -> &str {
        "Consulta horários disponíveis, agenda ou cancela uma visita técnica. \
         Use 'consult' para listar horários livres de um dia, 'book' para \
         confirmar uma visita e 'cancel' para cancelar uma visita existente."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "intent": {
                    "type": "string",
                    "enum": ["consult", "book", "cancel"],
                    "description": "O que fazer no calendário"
                },
                "customer_name": {"type": "string"},
                "customer_phone": {"type": "string"},
                "when": {
                    "type": "string",
                    "description": "Data (e hora, para book/cancel), ex: 30/10/2025 14:00"
                },
                "notes": {
                    "type": "string",
                    "description": "Contexto extra, ex: endereço da visita"
                }
            },
            "required": ["intent", "when"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let intent = BookingIntent::parse(required_str(&args, "intent")?)?;
        let when = parse_when(required_str(&args, "when")?)?;
        if when < Utc::now() && intent != BookingIntent::Consult {
            return Err(Error::Tool("the requested time is in the past".into()));
        }

        match intent {
            BookingIntent::Consult => {
                let slots = self.calendar.available_slots(when).await?;
                if slots.is_empty() {
                    Ok("Nenhum horário disponível nesse dia.".into())
                } else {
                    Ok(format!("Horários disponíveis: {}", slots.join(", ")))
                }
            }
            BookingIntent::Book => {
                let name = required_str(&args, "customer_name")?;
                let phone = required_str(&args, "customer_phone")?;
                let notes = args.get("notes").and_then(Value::as_str).unwrap_or("");
                let confirmation = self.calendar.book(name, phone, when, notes).await?;
                info!(customer = name, %when, "visit booked");
                Ok(confirmation)
            }
            BookingIntent::Cancel => {
                let name = required_str(&args, "customer_name")?;
                let confirmation = self.calendar.cancel(name, when).await?;
                info!(customer = name, %when, "visit cancelled");
                Ok(confirmation)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubCalendar;

    #[async_trait]
    impl CalendarService for StubCalendar {
        async fn available_slots(&self, _date: DateTime<Utc>) -> Result<Vec<String>> {
            Ok(vec!["08:00".into(), "09:00".into()])
        }
        async fn book(
            &self,
            customer_name: &str,
            _customer_phone: &str,
            _start: DateTime<Utc>,
            _notes: &str,
        ) -> Result<String> {
            Ok(format!("Visita confirmada para {customer_name}"))
        }
        async fn cancel(&self, customer_name: &str, _start: DateTime<Utc>) -> Result<String> {
            Ok(format!("Visita de {customer_name} cancelada"))
        }
    }

    #[tokio::test]
    async fn consult_lists_slots() {
        let tool = ScheduleVisit::new(Arc::new(StubCalendar));
        let out = tool
            .execute(json!({"intent": "consult", "when": "2030-01-15"}))
            .await
            .unwrap();
        assert!(out.contains("08:00"));
    }

    #[tokio::test]
    async fn book_requires_customer_fields() {
        let tool = ScheduleVisit::new(Arc::new(StubCalendar));
        let err = tool
            .execute(json!({"intent": "book", "when": "2030-01-15 14:00"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
    }

    #[tokio::test]
    async fn book_rejects_past_dates() {
        let tool = ScheduleVisit::new(Arc::new(StubCalendar));
        let err = tool
            .execute(json!({
                "intent": "book",
                "when": "2020-01-15 14:00",
                "customer_name": "Maria",
                "customer_phone": "5511999990000"
            }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("past"));
    }

    #[test]
    fn parses_brazilian_date_format() {
        let when = parse_when("30/10/2025 14:00").unwrap();
        assert_eq!(when.format("%Y-%m-%d %H:%M").to_string(), "2025-10-30 14:00");
    }

    #[test]
    fn intent_accepts_portuguese_aliases() {
        assert_eq!(BookingIntent::parse("agendar").unwrap(), BookingIntent::Book);
        assert_eq!(BookingIntent::parse("consultar").unwrap(), BookingIntent::Consult);
        assert!(BookingIntent::parse("whatever").is_err());
    }
}
