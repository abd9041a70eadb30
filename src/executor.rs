//! Action executor — applies each work item to the mailbox at most once.
//!
//! Per work item, in order:
//! 1. Ledger check — a recorded success for the (message, rule, action-type)
//!    key skips the item entirely, no mailbox call.
//! 2. Live-state check — if the mailbox already satisfies the action (message
//!    already read, already carrying the target label), record a success
//!    entry and skip the mutation. The ledger may be empty on a mailbox whose
//!    state predates this tool.
//! 3. Mutation — call the mailbox, record success or failure.
//!
//! Moves to trash skip step 2: a trashed message has no label state left to
//! query through this interface.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::MailboxError;
use crate::mailbox::{INBOX, Mailbox, TRASH, UNREAD};
use crate::rules::model::{ActionKind, ActionWorkItem};
use crate::store::{LedgerStatus, Store};

/// How one work item ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The mailbox was mutated.
    Applied,
    /// Nothing to do: the ledger or the live mailbox state already
    /// satisfied the action.
    AlreadySatisfied,
    Failed,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Result of executing one work item.
#[derive(Debug, Clone)]
pub struct ExecutedAction {
    pub email_id: String,
    pub rule_name: String,
    /// Ledger key the item executed under.
    pub action_type: String,
    pub outcome: Outcome,
    pub details: String,
}

/// Aggregate result of one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub success_count: usize,
    pub failed_count: usize,
    pub executed: Vec<ExecutedAction>,
}

/// Applies work items sequentially, consulting and updating the ledger.
pub struct ActionExecutor {
    mailbox: Arc<dyn Mailbox>,
    store: Arc<dyn Store>,
}

impl ActionExecutor {
    pub fn new(mailbox: Arc<dyn Mailbox>, store: Arc<dyn Store>) -> Self {
        Self { mailbox, store }
    }

    /// Execute one work item.
    pub async fn execute(&self, item: &ActionWorkItem) -> ExecutedAction {
        self.execute_tracked(item).await.0
    }

    /// Execute a worklist strictly in order, one item at a time.
    ///
    /// Failures are isolated per item and counted; the batch only stops
    /// early on an unrecoverable mailbox error (rate limit, auth), where
    /// every further call would fail the same way.
    pub async fn execute_all(&self, items: &[ActionWorkItem]) -> BatchReport {
        info!(count = items.len(), "Executing action worklist");

        let mut report = BatchReport::default();
        for (index, item) in items.iter().enumerate() {
            let (executed, stop) = self.execute_tracked(item).await;
            if executed.outcome.is_success() {
                report.success_count += 1;
            } else {
                report.failed_count += 1;
            }
            report.executed.push(executed);

            if stop {
                error!(
                    remaining = items.len() - index - 1,
                    "Stopping batch on unrecoverable mailbox error"
                );
                break;
            }
        }

        info!(
            success = report.success_count,
            failed = report.failed_count,
            "Batch complete"
        );
        report
    }

    /// Returns the executed item plus whether the batch should stop.
    async fn execute_tracked(&self, item: &ActionWorkItem) -> (ExecutedAction, bool) {
        let action_type = item.action.ledger_key();

        match self
            .store
            .has_success(&item.email_id, &item.rule_name, &action_type)
            .await
        {
            Ok(true) => {
                debug!(
                    email_id = %item.email_id,
                    rule = %item.rule_name,
                    action_type = %action_type,
                    "Action already recorded, skipping"
                );
                return (
                    executed(item, action_type, Outcome::AlreadySatisfied, "Already executed"),
                    false,
                );
            }
            Ok(false) => {}
            Err(e) => {
                // Without a readable ledger we cannot prove the action was
                // not already executed; mutating could apply it twice.
                warn!(
                    email_id = %item.email_id,
                    action_type = %action_type,
                    error = %e,
                    "Ledger lookup failed, not executing"
                );
                return (
                    executed(item, action_type, Outcome::Failed, &e.to_string()),
                    false,
                );
            }
        }

        let (outcome, details, stop) = match self.apply(item).await {
            Ok((outcome, details)) => (outcome, details, false),
            Err(e) => (Outcome::Failed, e.to_string(), e.is_fatal()),
        };

        let status = if outcome.is_success() {
            LedgerStatus::Success
        } else {
            LedgerStatus::Failed
        };
        if let Err(e) = self
            .store
            .record_action(&item.email_id, &item.rule_name, &action_type, &details, status)
            .await
        {
            // The outcome is still reported; a later run may redo the work.
            warn!(
                email_id = %item.email_id,
                action_type = %action_type,
                error = %e,
                "Failed to record ledger entry"
            );
        }

        match outcome {
            Outcome::Failed => warn!(
                email_id = %item.email_id,
                rule = %item.rule_name,
                action_type = %action_type,
                details = %details,
                "Action failed"
            ),
            _ => info!(
                email_id = %item.email_id,
                rule = %item.rule_name,
                action_type = %action_type,
                details = %details,
                "Action executed"
            ),
        }

        (executed(item, action_type, outcome, &details), stop)
    }

    /// Live-state check plus mutation. `Err` means a mailbox call failed;
    /// `Ok` with [`Outcome::Failed`] covers non-mailbox failures.
    async fn apply(
        &self,
        item: &ActionWorkItem,
    ) -> Result<(Outcome, String), MailboxError> {
        match &item.action.kind {
            ActionKind::MarkAsRead => self.set_read_state(&item.email_id, true).await,
            ActionKind::MarkAsUnread => self.set_read_state(&item.email_id, false).await,
            ActionKind::MoveMessage => {
                self.move_message(&item.email_id, item.action.folder()).await
            }
            ActionKind::Unknown(raw) => {
                warn!(kind = %raw, email_id = %item.email_id, "Unknown action type");
                Ok((Outcome::Failed, format!("Unknown action type: {raw}")))
            }
        }
    }

    async fn set_read_state(
        &self,
        email_id: &str,
        read: bool,
    ) -> Result<(Outcome, String), MailboxError> {
        let labels = self.mailbox.message_labels(email_id).await?;
        let is_read = !labels.contains(UNREAD);

        if read == is_read {
            let details = if read { "Already read" } else { "Already unread" };
            return Ok((Outcome::AlreadySatisfied, details.to_string()));
        }

        if read {
            self.mailbox.modify_labels(email_id, &[], &[UNREAD]).await?;
            Ok((Outcome::Applied, "Marked as read".to_string()))
        } else {
            self.mailbox.modify_labels(email_id, &[UNREAD], &[]).await?;
            Ok((Outcome::Applied, "Marked as unread".to_string()))
        }
    }

    async fn move_message(
        &self,
        email_id: &str,
        folder: &str,
    ) -> Result<(Outcome, String), MailboxError> {
        if folder.eq_ignore_ascii_case(INBOX) {
            let labels = self.mailbox.message_labels(email_id).await?;
            if labels.contains(INBOX) {
                return Ok((Outcome::AlreadySatisfied, "Already in inbox".to_string()));
            }
            self.mailbox.modify_labels(email_id, &[INBOX], &[]).await?;
            return Ok((Outcome::Applied, "Moved to inbox".to_string()));
        }

        if folder.eq_ignore_ascii_case(TRASH) {
            // Trashed messages have no queryable label state here; the
            // ledger check is the only idempotency guard.
            self.mailbox.trash(email_id).await?;
            return Ok((Outcome::Applied, "Moved to trash".to_string()));
        }

        // Exact-name label match; create the label if the mailbox lacks it.
        let all_labels = self.mailbox.list_labels().await?;
        let label_id = match all_labels.get(folder) {
            Some(id) => {
                let labels = self.mailbox.message_labels(email_id).await?;
                if labels.contains(id) {
                    return Ok((
                        Outcome::AlreadySatisfied,
                        format!("Already has label {folder}"),
                    ));
                }
                id.clone()
            }
            None => self.mailbox.create_label(folder).await?,
        };

        self.mailbox
            .modify_labels(email_id, &[label_id.as_str()], &[])
            .await?;
        Ok((Outcome::Applied, format!("Moved to {folder}")))
    }
}

fn executed(
    item: &ActionWorkItem,
    action_type: String,
    outcome: Outcome,
    details: &str,
) -> ExecutedAction {
    ExecutedAction {
        email_id: item.email_id.clone(),
        rule_name: item.rule_name.clone(),
        action_type,
        outcome,
        details: details.to_string(),
    }
}
