//! libSQL store backend — async [`Store`] implementation over a local
//! SQLite file or an in-memory database (tests).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::message::NormalizedMessage;
use crate::store::migrations;
use crate::store::traits::{LedgerEntry, LedgerStatus, Store};

/// libSQL-backed store.
///
/// Holds a single connection reused for all operations; the handle's
/// lifetime spans one processing run.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LedgerError::Connection(format!("Failed to create database directory: {e}"))
                })?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LedgerError::Connection(format!("Failed to open database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| LedgerError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        info!(path = %path.display(), "Store opened");
        Ok(store)
    }

    /// In-memory store (for tests).
    pub async fn new_memory() -> Result<Self, LedgerError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                LedgerError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;
        let conn = db
            .connect()
            .map_err(|e| LedgerError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into `DateTime<Utc>`.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn status_to_str(status: LedgerStatus) -> &'static str {
    match status {
        LedgerStatus::Success => "success",
        LedgerStatus::Failed => "failed",
    }
}

fn str_to_status(s: &str) -> LedgerStatus {
    match s {
        "failed" => LedgerStatus::Failed,
        _ => LedgerStatus::Success,
    }
}

const ENTRY_COLUMNS: &str = "email_id, rule_name, action_type, action_details, status, executed_at";

const MESSAGE_COLUMNS: &str =
    "id, thread_id, from_email, to_email, subject, body, date_received, is_read, labels, snippet";

/// Column order matches `ENTRY_COLUMNS`.
fn row_to_entry(row: &libsql::Row) -> Result<LedgerEntry, libsql::Error> {
    let status_str: String = row.get(4)?;
    let executed_str: String = row.get(5)?;
    Ok(LedgerEntry {
        email_id: row.get(0)?,
        rule_name: row.get(1)?,
        action_type: row.get(2)?,
        details: row.get(3)?,
        status: str_to_status(&status_str),
        executed_at: parse_datetime(&executed_str),
    })
}

/// Column order matches `MESSAGE_COLUMNS`. Labels are stored as a
/// comma-joined string.
fn row_to_message(row: &libsql::Row) -> Result<NormalizedMessage, libsql::Error> {
    let is_read: i64 = row.get(7)?;
    let labels: String = row.get(8)?;
    Ok(NormalizedMessage {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        from: row.get(2)?,
        to: row.get(3)?,
        subject: row.get(4)?,
        body: row.get(5)?,
        date: row.get(6)?,
        is_read: is_read != 0,
        labels: if labels.is_empty() {
            Vec::new()
        } else {
            labels.split(',').map(String::from).collect()
        },
        snippet: row.get(9)?,
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Store for LibSqlStore {
    async fn run_migrations(&self) -> Result<(), LedgerError> {
        migrations::run(self.conn()).await
    }

    async fn has_success(
        &self,
        email_id: &str,
        rule_name: &str,
        action_type: &str,
    ) -> Result<bool, LedgerError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM email_actions
                 WHERE email_id = ?1 AND rule_name = ?2 AND action_type = ?3
                   AND status = 'success'",
                params![email_id, rule_name, action_type],
            )
            .await
            .map_err(|e| LedgerError::Query(format!("Ledger lookup failed: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| LedgerError::Query(format!("Ledger lookup failed: {e}")))?;

        match row {
            Some(row) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| LedgerError::Query(format!("Ledger lookup failed: {e}")))?;
                Ok(count > 0)
            }
            None => Ok(false),
        }
    }

    async fn record_action(
        &self,
        email_id: &str,
        rule_name: &str,
        action_type: &str,
        details: &str,
        status: LedgerStatus,
    ) -> Result<(), LedgerError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO email_actions
                 (email_id, rule_name, action_type, action_details, status, executed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    email_id,
                    rule_name,
                    action_type,
                    details,
                    status_to_str(status),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| LedgerError::Query(format!("Failed to record action: {e}")))?;

        debug!(email_id, action_type, "Recorded ledger entry");
        Ok(())
    }

    async fn actions_for_email(&self, email_id: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM email_actions
                     WHERE email_id = ?1 ORDER BY id"
                ),
                params![email_id],
            )
            .await
            .map_err(|e| LedgerError::Query(format!("Failed to load ledger entries: {e}")))?;

        let mut entries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| LedgerError::Query(format!("Failed to read ledger entries: {e}")))?
        {
            entries.push(
                row_to_entry(&row)
                    .map_err(|e| LedgerError::Query(format!("Failed to read ledger row: {e}")))?,
            );
        }
        Ok(entries)
    }

    async fn message_exists(&self, email_id: &str) -> Result<bool, LedgerError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM emails WHERE id = ?1",
                params![email_id],
            )
            .await
            .map_err(|e| LedgerError::Query(format!("Message lookup failed: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| LedgerError::Query(format!("Message lookup failed: {e}")))?;

        match row {
            Some(row) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| LedgerError::Query(format!("Message lookup failed: {e}")))?;
                Ok(count > 0)
            }
            None => Ok(false),
        }
    }

    async fn insert_messages(&self, messages: &[NormalizedMessage]) -> Result<(), LedgerError> {
        for message in messages {
            self.conn()
                .execute(
                    "INSERT OR REPLACE INTO emails
                     (id, thread_id, from_email, to_email, subject, body,
                      date_received, is_read, labels, snippet)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        message.id.as_str(),
                        message.thread_id.as_str(),
                        message.from.as_str(),
                        message.to.as_str(),
                        message.subject.as_str(),
                        message.body.as_str(),
                        message.date.as_str(),
                        message.is_read as i64,
                        message.labels.join(","),
                        message.snippet.as_str(),
                    ],
                )
                .await
                .map_err(|e| {
                    LedgerError::Query(format!("Failed to insert message {}: {e}", message.id))
                })?;
        }
        debug!(count = messages.len(), "Cached messages");
        Ok(())
    }

    async fn messages_by_ids(&self, ids: &[String]) -> Result<Vec<NormalizedMessage>, LedgerError> {
        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            let mut rows = self
                .conn()
                .query(
                    &format!("SELECT {MESSAGE_COLUMNS} FROM emails WHERE id = ?1"),
                    params![id.as_str()],
                )
                .await
                .map_err(|e| LedgerError::Query(format!("Failed to load message {id}: {e}")))?;

            if let Some(row) = rows
                .next()
                .await
                .map_err(|e| LedgerError::Query(format!("Failed to load message {id}: {e}")))?
            {
                messages.push(row_to_message(&row).map_err(|e| {
                    LedgerError::Query(format!("Failed to read message row: {e}"))
                })?);
            }
        }
        Ok(messages)
    }
}
