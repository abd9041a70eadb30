//! Local JSON-snapshot mailbox — a file-backed [`Mailbox`] implementation.
//!
//! Default adapter for the CLI: reads a snapshot of messages and labels
//! from a JSON file and persists every mutation back to it. Real mailbox
//! backends implement the same trait.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::MailboxError;
use crate::mailbox::{INBOX, Mailbox, TRASH, UNREAD};
use crate::message::NormalizedMessage;

/// On-disk snapshot format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    /// Label name → label ID.
    #[serde(default)]
    labels: HashMap<String, String>,
    #[serde(default)]
    messages: Vec<NormalizedMessage>,
}

/// File-backed mailbox. Single writer; state is guarded by a mutex and
/// written back to disk after every mutation.
pub struct LocalMailbox {
    path: PathBuf,
    state: Mutex<Snapshot>,
}

impl LocalMailbox {
    /// Load a snapshot from disk. A missing file starts an empty mailbox.
    pub fn open(path: &Path) -> Result<Self, MailboxError> {
        let snapshot = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                MailboxError::Snapshot(format!("failed to read {}: {e}", path.display()))
            })?;
            serde_json::from_str(&raw).map_err(|e| {
                MailboxError::Snapshot(format!("malformed snapshot {}: {e}", path.display()))
            })?
        } else {
            info!(path = %path.display(), "Mailbox snapshot not found, starting empty");
            Snapshot::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(snapshot),
        })
    }

    fn state(&self) -> MutexGuard<'_, Snapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<(), MailboxError> {
        let raw = serde_json::to_string_pretty(snapshot)
            .map_err(|e| MailboxError::Snapshot(format!("failed to serialize snapshot: {e}")))?;
        std::fs::write(&self.path, raw).map_err(|e| {
            MailboxError::Snapshot(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl Mailbox for LocalMailbox {
    async fn list_message_ids(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, MailboxError> {
        if !query.is_empty() && query != "in:all" {
            debug!(query, "Snapshot mailbox does not filter queries");
        }
        let state = self.state();
        Ok(state
            .messages
            .iter()
            .filter(|m| !m.labels.iter().any(|l| l.as_str() == TRASH))
            .take(limit)
            .map(|m| m.id.clone())
            .collect())
    }

    async fn fetch_message(&self, message_id: &str) -> Result<NormalizedMessage, MailboxError> {
        let state = self.state();
        state
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| MailboxError::Fetch(format!("no such message: {message_id}")))
    }

    async fn message_labels(&self, message_id: &str) -> Result<HashSet<String>, MailboxError> {
        let state = self.state();
        let message = state
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .ok_or_else(|| MailboxError::LabelQuery(format!("no such message: {message_id}")))?;
        Ok(message.labels.iter().cloned().collect())
    }

    async fn list_labels(&self) -> Result<HashMap<String, String>, MailboxError> {
        Ok(self.state().labels.clone())
    }

    async fn create_label(&self, name: &str) -> Result<String, MailboxError> {
        let mut state = self.state();
        if let Some(id) = state.labels.get(name) {
            return Ok(id.clone());
        }
        let id = format!("Label_{}", state.labels.len() + 1);
        state.labels.insert(name.to_string(), id.clone());
        self.persist(&state)?;
        info!(label = name, id = %id, "Created label");
        Ok(id)
    }

    async fn modify_labels(
        &self,
        message_id: &str,
        add: &[&str],
        remove: &[&str],
    ) -> Result<(), MailboxError> {
        let mut state = self.state();
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| MailboxError::Modify {
                message_id: message_id.to_string(),
                reason: "no such message".to_string(),
            })?;

        for label in add {
            if !message.labels.iter().any(|l| l == label) {
                message.labels.push((*label).to_string());
            }
        }
        message.labels.retain(|l| !remove.contains(&l.as_str()));
        message.is_read = !message.labels.iter().any(|l| l.as_str() == UNREAD);

        self.persist(&state)
    }

    async fn trash(&self, message_id: &str) -> Result<(), MailboxError> {
        let mut state = self.state();
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| MailboxError::Trash {
                message_id: message_id.to_string(),
                reason: "no such message".to_string(),
            })?;

        if !message.labels.iter().any(|l| l.as_str() == TRASH) {
            message.labels.push(TRASH.to_string());
        }
        message.labels.retain(|l| l.as_str() != INBOX);

        self.persist(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message(id: &str, labels: &[&str]) -> NormalizedMessage {
        NormalizedMessage {
            id: id.to_string(),
            thread_id: format!("thread-{id}"),
            from: "alice@example.com".to_string(),
            to: "me@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "Hi there".to_string(),
            date: "Wed, 10 Jul 2025 10:30:00 +0000".to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            is_read: !labels.contains(&UNREAD),
            snippet: "Hi there".to_string(),
        }
    }

    fn snapshot_file(messages: Vec<NormalizedMessage>) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let snapshot = Snapshot {
            labels: HashMap::from([
                (INBOX.to_string(), INBOX.to_string()),
                (UNREAD.to_string(), UNREAD.to_string()),
            ]),
            messages,
        };
        std::fs::write(file.path(), serde_json::to_string(&snapshot).unwrap()).unwrap();
        file
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = LocalMailbox::open(&dir.path().join("mailbox.json")).unwrap();
        assert!(mailbox.list_message_ids("in:all", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_and_fetches_messages() {
        let file = snapshot_file(vec![
            sample_message("m1", &[INBOX, UNREAD]),
            sample_message("m2", &[INBOX]),
        ]);
        let mailbox = LocalMailbox::open(file.path()).unwrap();

        let ids = mailbox.list_message_ids("in:all", 10).await.unwrap();
        assert_eq!(ids, vec!["m1", "m2"]);

        let message = mailbox.fetch_message("m2").await.unwrap();
        assert_eq!(message.from, "alice@example.com");
        assert!(mailbox.fetch_message("nope").await.is_err());
    }

    #[tokio::test]
    async fn list_honors_limit() {
        let file = snapshot_file(vec![
            sample_message("m1", &[INBOX]),
            sample_message("m2", &[INBOX]),
            sample_message("m3", &[INBOX]),
        ]);
        let mailbox = LocalMailbox::open(file.path()).unwrap();
        assert_eq!(mailbox.list_message_ids("in:all", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn modify_labels_flips_read_state_and_persists() {
        let file = snapshot_file(vec![sample_message("m1", &[INBOX, UNREAD])]);
        let mailbox = LocalMailbox::open(file.path()).unwrap();

        mailbox.modify_labels("m1", &[], &[UNREAD]).await.unwrap();
        let labels = mailbox.message_labels("m1").await.unwrap();
        assert!(!labels.contains(UNREAD));

        // A fresh instance sees the persisted mutation.
        let reloaded = LocalMailbox::open(file.path()).unwrap();
        let message = reloaded.fetch_message("m1").await.unwrap();
        assert!(message.is_read);
    }

    #[tokio::test]
    async fn create_label_assigns_stable_ids() {
        let file = snapshot_file(vec![]);
        let mailbox = LocalMailbox::open(file.path()).unwrap();

        let id = mailbox.create_label("Important").await.unwrap();
        // Creating again returns the existing ID.
        assert_eq!(mailbox.create_label("Important").await.unwrap(), id);
        assert_eq!(mailbox.list_labels().await.unwrap().get("Important"), Some(&id));
    }

    #[tokio::test]
    async fn trash_hides_message_from_listing() {
        let file = snapshot_file(vec![sample_message("m1", &[INBOX])]);
        let mailbox = LocalMailbox::open(file.path()).unwrap();

        mailbox.trash("m1").await.unwrap();
        assert!(mailbox.list_message_ids("in:all", 10).await.unwrap().is_empty());

        let labels = mailbox.message_labels("m1").await.unwrap();
        assert!(labels.contains(TRASH));
        assert!(!labels.contains(INBOX));
    }
}
