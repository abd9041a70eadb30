//! Error types for mailsieve.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),
}

/// Rule-document loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse rule document: {0}")]
    Parse(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ledger / message-store errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Mailbox collaborator errors (fetch, label queries, mutations).
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Label query failed: {0}")]
    LabelQuery(String),

    #[error("Label creation failed for {name}: {reason}")]
    LabelCreate { name: String, reason: String },

    #[error("Label modify failed for message {message_id}: {reason}")]
    Modify { message_id: String, reason: String },

    #[error("Trash failed for message {message_id}: {reason}")]
    Trash { message_id: String, reason: String },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Rate limited by mailbox API")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl MailboxError {
    /// True when every further call this run would fail the same way, so a
    /// batch should stop instead of burning quota.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Auth(_))
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
