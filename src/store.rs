//! Durable storage for captured messages.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior, NO_PARAMS};
use serde::Serialize;

use crate::data::{CapturedMessage, NewMessage};
use crate::error::StoreError;

static SCHEMA_SQL: &'static str = include_str!("schema.sql");
static INSERT_MESSAGE_SQL: &'static str = "INSERT INTO webhook_message \
     (request_method, request_path, headers, body, source_ip, received_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
static SELECT_MESSAGE_SQL: &'static str = "SELECT id, request_method, request_path, headers, body, \
     source_ip, received_at FROM webhook_message WHERE id = ?1";
static COUNT_MESSAGES_SQL: &'static str = "SELECT COUNT(*) FROM webhook_message";

pub const METHOD_LIMIT: usize = 10;
pub const PATH_LIMIT: usize = 500;
pub const SOURCE_IP_LIMIT: usize = 50;

pub const EMPTY_HEADERS: &str = "{}";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Append-only sink for captured messages.
pub trait MessageStore: Send + Sync {
    /// Writes one message atomically and returns it with its assigned id and
    /// receipt time.
    fn persist(&self, message: NewMessage) -> Result<CapturedMessage, StoreError>;
}

/// SQLite-backed store. Every call opens its own connection, so concurrent
/// writers are serialized by SQLite's locking rather than by this type.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<SqliteStore, StoreError> {
        let store = SqliteStore {
            path: path.as_ref().to_path_buf(),
        };
        let conn = store.connect()?;
        conn.execute_batch(SCHEMA_SQL)?;
        info!("Using database {}", store.path.display());
        Ok(store)
    }

    pub fn find(&self, id: i64) -> Result<Option<CapturedMessage>, StoreError> {
        let conn = self.connect()?;
        let message = conn
            .query_row(SELECT_MESSAGE_SQL, params![id], message_from_row)
            .optional()?;
        Ok(message)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(COUNT_MESSAGES_SQL, NO_PARAMS, |row| row.get(0))?;
        Ok(count)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

impl MessageStore for SqliteStore {
    fn persist(&self, message: NewMessage) -> Result<CapturedMessage, StoreError> {
        check_length("request_method", &message.method, METHOD_LIMIT)?;
        check_length("request_path", &message.path, PATH_LIMIT)?;
        check_length("source_ip", &message.source_ip, SOURCE_IP_LIMIT)?;

        let headers = headers_to_json(&message.headers);

        let mut conn = self.connect()?;
        // Immediate: take the write lock before stamping the time, so
        // received_at follows id order across concurrent writers.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let received_at = message
            .received_at
            .unwrap_or_else(|| Local::now().naive_local());
        tx.execute(
            INSERT_MESSAGE_SQL,
            params![
                message.method,
                message.path,
                headers,
                message.body,
                message.source_ip,
                received_at
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        let saved = CapturedMessage {
            id,
            method: message.method,
            path: message.path,
            headers,
            body: message.body,
            source_ip: message.source_ip,
            received_at,
        };
        info!(
            "Stored webhook message id={} received_at={}",
            saved.id,
            saved.received_at_formatted()
        );
        Ok(saved)
    }
}

/// Serializes headers to JSON text, falling back to `{}` on failure.
pub fn headers_to_json<T: Serialize + ?Sized>(headers: &T) -> String {
    serde_json::to_string(headers).unwrap_or_else(|err| {
        warn!("Cannot serialize headers, storing {}: {}", EMPTY_HEADERS, err);
        EMPTY_HEADERS.to_owned()
    })
}

fn check_length(field: &'static str, value: &str, limit: usize) -> Result<(), StoreError> {
    let actual = value.chars().count();
    if actual > limit {
        return Err(StoreError::FieldTooLong {
            field,
            limit,
            actual,
        });
    }
    Ok(())
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<CapturedMessage> {
    Ok(CapturedMessage {
        id: row.get(0)?,
        method: row.get(1)?,
        path: row.get(2)?,
        headers: row.get(3)?,
        body: row.get(4)?,
        source_ip: row.get(5)?,
        received_at: row.get(6)?,
    })
}
