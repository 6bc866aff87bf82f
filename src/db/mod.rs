//! SQLite-backed persistence
//!
//! A small connection pool shared by the customer directory and the
//! conversation history store.

mod customer;
mod history;
mod schema;

pub use customer::{CustomerRecord, CustomerRepo, NewCustomer};
pub use history::HistoryRepo;

use std::path::Path;

use r2d2_sqlite::SqliteConnectionManager;

use crate::{Error, Result};

/// Shared connection pool
pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

/// Open (or create) the database at `path` and run migrations.
///
/// # Errors
///
/// Returns `Error::Database` when the pool cannot be built or the schema
/// cannot be applied.
pub fn init(path: &Path) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path);
    build(manager, 4)
}

/// In-memory database for tests; a single connection so every handle sees
/// the same data.
///
/// # Errors
///
/// Returns `Error::Database` when the pool cannot be built.
pub fn init_memory() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();
    build(manager, 1)
}

fn build(manager: SqliteConnectionManager, max_size: u32) -> Result<DbPool> {
    let pool = r2d2::Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| Error::Database(format!("failed to build pool: {e}")))?;
    let conn = pool
        .get()
        .map_err(|e| Error::Database(format!("failed to get connection: {e}")))?;
    schema::init(&conn)?;
    Ok(pool)
}

pub(crate) fn get_conn(
    pool: &DbPool,
) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
    pool.get()
        .map_err(|e| Error::Database(format!("failed to get connection: {e}")))
}
