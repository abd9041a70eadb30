//! Mailbox collaborator trait — pure I/O, no rule logic.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::MailboxError;
use crate::message::NormalizedMessage;

pub mod local;

pub use local::LocalMailbox;

/// System label marking a message as unread.
pub const UNREAD: &str = "UNREAD";
/// System label for the inbox.
pub const INBOX: &str = "INBOX";
/// System label for trashed messages.
pub const TRASH: &str = "TRASH";

/// Query/mutation surface of the mailbox backend.
///
/// Adapters (a real mail API client, the local snapshot, fakes in tests)
/// implement this; the engine and executor never touch a mail API directly.
/// Label names are matched case-sensitively; label IDs are opaque.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// List message IDs matching `query`, in mailbox order, up to `limit`.
    async fn list_message_ids(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, MailboxError>;

    /// Fetch the full normalized record for one message.
    async fn fetch_message(&self, message_id: &str) -> Result<NormalizedMessage, MailboxError>;

    /// Current label IDs on a message.
    async fn message_labels(&self, message_id: &str) -> Result<HashSet<String>, MailboxError>;

    /// All labels in the mailbox, name → ID.
    async fn list_labels(&self) -> Result<HashMap<String, String>, MailboxError>;

    /// Create a label with default visibility. Returns the new label ID.
    async fn create_label(&self, name: &str) -> Result<String, MailboxError>;

    /// Add and remove labels on a message.
    async fn modify_labels(
        &self,
        message_id: &str,
        add: &[&str],
        remove: &[&str],
    ) -> Result<(), MailboxError>;

    /// Move a message to trash. Irreversible through this interface.
    async fn trash(&self, message_id: &str) -> Result<(), MailboxError>;
}
