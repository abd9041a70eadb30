//! Normalized message record consumed by the rule engine.

use serde::{Deserialize, Serialize};

/// Mailbox-agnostic message record.
///
/// Produced by the fetch collaborator and cached in the store; the engine
/// and executor treat it as read-only. Labels and read state reflect the
/// mailbox at fetch time — the executor re-queries live state before
/// mutating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Mailbox-assigned unique ID.
    pub id: String,
    /// Thread this message belongs to.
    pub thread_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// RFC 2822 date header, verbatim.
    pub date: String,
    /// Label identifiers attached at fetch time.
    pub labels: Vec<String>,
    pub is_read: bool,
    /// Short preview used in logs.
    pub snippet: String,
}
