//! Backend-agnostic persistence trait — action ledger plus message cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::LedgerError;
use crate::message::NormalizedMessage;

/// Status recorded for a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStatus {
    Success,
    Failed,
}

/// A recorded execution of one (message, rule, action-type) key.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub email_id: String,
    pub rule_name: String,
    pub action_type: String,
    pub details: String,
    pub status: LedgerStatus,
    pub executed_at: DateTime<Utc>,
}

/// Persistence used by the executor (ledger) and the fetch cache
/// (messages).
///
/// The connection/session lifetime is owned by whoever constructs the
/// backend — one handle per processing run.
#[async_trait]
pub trait Store: Send + Sync {
    /// Apply pending schema migrations.
    async fn run_migrations(&self) -> Result<(), LedgerError>;

    // ── Action ledger ───────────────────────────────────────────────

    /// Whether a success entry exists for this key. Any success row
    /// permanently short-circuits re-execution of the key.
    async fn has_success(
        &self,
        email_id: &str,
        rule_name: &str,
        action_type: &str,
    ) -> Result<bool, LedgerError>;

    /// Insert-or-replace the entry for this key. A retry after a failed
    /// attempt overwrites the failed row.
    async fn record_action(
        &self,
        email_id: &str,
        rule_name: &str,
        action_type: &str,
        details: &str,
        status: LedgerStatus,
    ) -> Result<(), LedgerError>;

    /// All recorded entries for one message, oldest first.
    async fn actions_for_email(&self, email_id: &str) -> Result<Vec<LedgerEntry>, LedgerError>;

    // ── Message cache ───────────────────────────────────────────────

    /// Whether a message has already been fetched and cached.
    async fn message_exists(&self, email_id: &str) -> Result<bool, LedgerError>;

    /// Insert-or-replace fetched messages.
    async fn insert_messages(&self, messages: &[NormalizedMessage]) -> Result<(), LedgerError>;

    /// Load cached messages by ID. Unknown IDs are skipped.
    async fn messages_by_ids(&self, ids: &[String]) -> Result<Vec<NormalizedMessage>, LedgerError>;
}
