use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::internal_error::{InternalError, InternalResult};

pub type DBConnection = Arc<Mutex<Connection>>;

/// Runs `f` inside a single transaction while holding the connection lock.
///
/// The transaction is rolled back when `f` returns an error, so callers never
/// observe a partially applied mutation.
pub fn with_transaction<T>(
    db_connection: &DBConnection,
    f: impl FnOnce(&Connection) -> InternalResult<T>,
) -> InternalResult<T> {
    let mut db_connection = db_connection.lock()?;
    let transaction = db_connection.transaction()?;

    let value = f(&transaction)?;
    transaction.commit()?;

    Ok(value)
}

pub fn parse_iso_date(field: &str, value: &str) -> InternalResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| InternalError::validation(format!("Invalid {}: '{}'", field, value)))
}

pub fn open_database(path: &Path) -> InternalResult<DBConnection> {
    let connection = Connection::open(path)?;
    init_schema(&connection)?;

    Ok(Arc::new(Mutex::new(connection)))
}

pub fn init_schema(connection: &Connection) -> InternalResult<()> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS goals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL
        )",
        params![],
    )?;
    connection.execute(
        "CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT 'personal',
            frequency TEXT NOT NULL DEFAULT 'daily',
            due_date TEXT,
            progress INTEGER NOT NULL DEFAULT 0,
            completed INTEGER NOT NULL DEFAULT 0,
            notes TEXT NOT NULL DEFAULT '',
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        params![],
    )?;
    connection.execute(
        "CREATE TABLE IF NOT EXISTS task_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
            done_on TEXT NOT NULL,
            note TEXT NOT NULL DEFAULT 'completed'
        )",
        params![],
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS task_logs_done_on ON task_logs (done_on)",
        params![],
    )?;

    Ok(())
}

#[cfg(test)]
pub fn memory_database() -> DBConnection {
    Arc::new(Mutex::new(memory_connection()))
}

#[cfg(test)]
pub fn memory_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("in-memory database");
    init_schema(&connection).expect("schema");
    connection
}
