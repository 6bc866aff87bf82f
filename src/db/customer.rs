//! Customer directory
//!
//! Keyed by phone number; one record per customer, written once on first
//! contact.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{get_conn, DbPool};
use crate::{Error, Result};

/// A stored customer record
#[derive(Debug, Clone)]
pub struct CustomerRecord {
    pub id: String,
    pub phone: String,
    pub display_name: String,
    pub first_message: String,
    pub first_message_kind: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to register a customer
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub phone: String,
    pub display_name: String,
    pub first_message: String,
    pub first_message_kind: String,
}

/// Customer directory backed by the shared pool
#[derive(Clone)]
pub struct CustomerRepo {
    pool: DbPool,
}

impl CustomerRepo {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Look up a customer by phone number.
    ///
    /// # Errors
    ///
    /// Returns a database error on query failure; an absent record is
    /// `Ok(None)`, not an error.
    pub fn find(&self, phone: &str) -> Result<Option<CustomerRecord>> {
        let conn = get_conn(&self.pool)?;
        let record = conn
            .query_row(
                "SELECT id, phone, display_name, first_message, first_message_kind,
                        created_at, updated_at
                 FROM customers WHERE phone = ?1",
                params![phone],
                |row| {
                    Ok(CustomerRecord {
                        id: row.get(0)?,
                        phone: row.get(1)?,
                        display_name: row.get(2)?,
                        first_message: row.get(3)?,
                        first_message_kind: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Register a new customer.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` when the phone number or display name is
    /// blank, and a database error if the insert fails.
    pub fn insert(&self, new: &NewCustomer) -> Result<CustomerRecord> {
        if new.phone.trim().is_empty() {
            return Err(Error::Validation("customer phone is required".into()));
        }
        if new.display_name.trim().is_empty() {
            return Err(Error::Validation("customer name is required".into()));
        }
        let now = Utc::now().to_rfc3339();
        let record = CustomerRecord {
            id: Uuid::new_v4().to_string(),
            phone: new.phone.clone(),
            display_name: new.display_name.clone(),
            first_message: new.first_message.clone(),
            first_message_kind: new.first_message_kind.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        let conn = get_conn(&self.pool)?;
        conn.execute(
            "INSERT INTO customers
                (id, phone, display_name, first_message, first_message_kind,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.phone,
                record.display_name,
                record.first_message,
                record.first_message_kind,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(record)
    }
}
