//! Message fetch layer — substitutable provider plus a store-backed cache.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::MailboxError;
use crate::mailbox::Mailbox;
use crate::message::NormalizedMessage;
use crate::store::Store;

/// Source of normalized messages for a processing pass.
///
/// The engine only sees this trait; tests substitute fixed-list fakes.
#[async_trait]
pub trait MessageProvider: Send + Sync {
    /// Fetch up to `limit` messages matching `query`, in mailbox list
    /// order.
    async fn fetch(&self, query: &str, limit: usize)
    -> Result<Vec<NormalizedMessage>, MailboxError>;
}

/// Store-backed caching provider.
///
/// Lists message IDs from the mailbox, serves previously cached messages
/// from the store, fetches and persists only the new ones, and returns
/// everything in list order.
pub struct CachedProvider {
    mailbox: Arc<dyn Mailbox>,
    store: Arc<dyn Store>,
}

impl CachedProvider {
    pub fn new(mailbox: Arc<dyn Mailbox>, store: Arc<dyn Store>) -> Self {
        Self { mailbox, store }
    }
}

#[async_trait]
impl MessageProvider for CachedProvider {
    async fn fetch(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<NormalizedMessage>, MailboxError> {
        let ids = self.mailbox.list_message_ids(query, limit).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut cached_ids = Vec::new();
        let mut new_ids = Vec::new();
        for id in &ids {
            match self.store.message_exists(id).await {
                Ok(true) => cached_ids.push(id.clone()),
                Ok(false) => new_ids.push(id.clone()),
                Err(e) => {
                    warn!(id = %id, error = %e, "Store lookup failed, refetching");
                    new_ids.push(id.clone());
                }
            }
        }

        let mut by_id: HashMap<String, NormalizedMessage> = HashMap::new();

        if !cached_ids.is_empty() {
            debug!(count = cached_ids.len(), "Loading messages from cache");
            match self.store.messages_by_ids(&cached_ids).await {
                Ok(found) => {
                    for message in found {
                        by_id.insert(message.id.clone(), message);
                    }
                }
                Err(e) => warn!(error = %e, "Failed to load cached messages"),
            }
        }

        let mut fetched = Vec::new();
        for id in &new_ids {
            match self.mailbox.fetch_message(id).await {
                Ok(message) => fetched.push(message),
                Err(e) => warn!(id = %id, error = %e, "Failed to fetch message, skipping"),
            }
        }

        if !fetched.is_empty() {
            info!(count = fetched.len(), "Caching newly fetched messages");
            if let Err(e) = self.store.insert_messages(&fetched).await {
                warn!(error = %e, "Failed to cache fetched messages");
            }
            for message in fetched {
                by_id.insert(message.id.clone(), message);
            }
        }

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;
    use crate::store::LibSqlStore;

    /// Mailbox fake that counts full-message fetches.
    struct CountingMailbox {
        messages: Vec<NormalizedMessage>,
        fetch_calls: Mutex<usize>,
    }

    impl CountingMailbox {
        fn new(messages: Vec<NormalizedMessage>) -> Self {
            Self {
                messages,
                fetch_calls: Mutex::new(0),
            }
        }

        fn fetch_calls(&self) -> usize {
            *self.fetch_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Mailbox for CountingMailbox {
        async fn list_message_ids(
            &self,
            _query: &str,
            limit: usize,
        ) -> Result<Vec<String>, MailboxError> {
            Ok(self.messages.iter().take(limit).map(|m| m.id.clone()).collect())
        }

        async fn fetch_message(
            &self,
            message_id: &str,
        ) -> Result<NormalizedMessage, MailboxError> {
            *self.fetch_calls.lock().unwrap() += 1;
            self.messages
                .iter()
                .find(|m| m.id == message_id)
                .cloned()
                .ok_or_else(|| MailboxError::Fetch(format!("no such message: {message_id}")))
        }

        async fn message_labels(
            &self,
            _message_id: &str,
        ) -> Result<HashSet<String>, MailboxError> {
            Ok(HashSet::new())
        }

        async fn list_labels(&self) -> Result<HashMap<String, String>, MailboxError> {
            Ok(HashMap::new())
        }

        async fn create_label(&self, _name: &str) -> Result<String, MailboxError> {
            Err(MailboxError::LabelCreate {
                name: "unused".to_string(),
                reason: "not supported".to_string(),
            })
        }

        async fn modify_labels(
            &self,
            _message_id: &str,
            _add: &[&str],
            _remove: &[&str],
        ) -> Result<(), MailboxError> {
            Ok(())
        }

        async fn trash(&self, _message_id: &str) -> Result<(), MailboxError> {
            Ok(())
        }
    }

    fn sample_message(id: &str) -> NormalizedMessage {
        NormalizedMessage {
            id: id.to_string(),
            thread_id: "t1".to_string(),
            from: "alice@example.com".to_string(),
            to: "me@example.com".to_string(),
            subject: format!("Subject {id}"),
            body: "body".to_string(),
            date: "Wed, 10 Jul 2025 10:30:00 +0000".to_string(),
            labels: vec!["INBOX".to_string()],
            is_read: true,
            snippet: "body".to_string(),
        }
    }

    #[tokio::test]
    async fn first_fetch_populates_cache() {
        let mailbox = Arc::new(CountingMailbox::new(vec![
            sample_message("m1"),
            sample_message("m2"),
        ]));
        let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let provider = CachedProvider::new(Arc::clone(&mailbox) as Arc<dyn Mailbox>, Arc::clone(&store));

        let messages = provider.fetch("in:all", 10).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(mailbox.fetch_calls(), 2);
        assert!(store.message_exists("m1").await.unwrap());
        assert!(store.message_exists("m2").await.unwrap());
    }

    #[tokio::test]
    async fn second_fetch_serves_from_cache() {
        let mailbox = Arc::new(CountingMailbox::new(vec![
            sample_message("m1"),
            sample_message("m2"),
        ]));
        let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let provider = CachedProvider::new(Arc::clone(&mailbox) as Arc<dyn Mailbox>, store);

        provider.fetch("in:all", 10).await.unwrap();
        let messages = provider.fetch("in:all", 10).await.unwrap();

        assert_eq!(messages.len(), 2);
        // No additional full fetches on the second pass.
        assert_eq!(mailbox.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn preserves_list_order_across_cache_and_fetch() {
        let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        // Pre-cache m2 so the pass mixes cached and fresh messages.
        store.insert_messages(&[sample_message("m2")]).await.unwrap();

        let mailbox = Arc::new(CountingMailbox::new(vec![
            sample_message("m1"),
            sample_message("m2"),
            sample_message("m3"),
        ]));
        let provider = CachedProvider::new(Arc::clone(&mailbox) as Arc<dyn Mailbox>, store);

        let messages = provider.fetch("in:all", 10).await.unwrap();
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert_eq!(mailbox.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn empty_listing_short_circuits() {
        let mailbox = Arc::new(CountingMailbox::new(vec![]));
        let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let provider = CachedProvider::new(Arc::clone(&mailbox) as Arc<dyn Mailbox>, store);

        assert!(provider.fetch("in:all", 10).await.unwrap().is_empty());
        assert_eq!(mailbox.fetch_calls(), 0);
    }
}
