//! Conversation history store
//!
//! Each turn is one row; the agent reads the most recent N turns and
//! prepends them to the model context as plain text.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use super::{get_conn, DbPool};
use crate::state::{HistoryTurn, Role};
use crate::Result;

/// Conversation history backed by the shared pool
#[derive(Clone)]
pub struct HistoryRepo {
    pool: DbPool,
}

impl HistoryRepo {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append one turn to a customer's history.
    ///
    /// # Errors
    ///
    /// Returns a database error on insert failure.
    pub fn append(&self, phone: &str, role: Role, content: &str) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        conn.execute(
            "INSERT INTO history (id, phone, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                phone,
                role.as_str(),
                content,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The customer's most recent `limit` turns, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a database error on query failure.
    pub fn recent(&self, phone: &str, limit: usize) -> Result<Vec<HistoryTurn>> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT role, content FROM history
             WHERE phone = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )?;
        let mut turns = stmt
            .query_map(params![phone, limit as i64], |row| {
                let role: String = row.get(0)?;
                let content: String = row.get(1)?;
                Ok(HistoryTurn {
                    role: if role == "assistant" {
                        Role::Assistant
                    } else {
                        Role::Customer
                    },
                    content,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        turns.reverse();
        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn recent_returns_latest_turns_oldest_first() {
        let repo = HistoryRepo::new(db::init_memory().unwrap());
        for i in 0..5 {
            repo.append("551199", Role::Customer, &format!("msg {i}")).unwrap();
            repo.append("551199", Role::Assistant, &format!("reply {i}")).unwrap();
        }
        let turns = repo.recent("551199", 4).unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "msg 3");
        assert_eq!(turns[3].content, "reply 4");
        assert_eq!(turns[3].role, Role::Assistant);
    }

    #[test]
    fn histories_are_isolated_by_phone() {
        let repo = HistoryRepo::new(db::init_memory().unwrap());
        repo.append("111", Role::Customer, "a").unwrap();
        repo.append("222", Role::Customer, "b").unwrap();
        let turns = repo.recent("111", 10).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "a");
    }
}
