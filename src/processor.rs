//! One-pass orchestration: fetch, evaluate, execute.

use std::sync::Arc;

use tracing::info;

use crate::executor::{ActionExecutor, BatchReport};
use crate::rules::RuleEngine;
use crate::source::MessageProvider;

/// Runs a complete processing pass over the mailbox.
///
/// The batch is fetched and evaluated to completion before any action
/// executes; actions then run strictly in worklist order.
pub struct Processor {
    engine: RuleEngine,
    provider: Arc<dyn MessageProvider>,
    executor: ActionExecutor,
}

impl Processor {
    pub fn new(
        engine: RuleEngine,
        provider: Arc<dyn MessageProvider>,
        executor: ActionExecutor,
    ) -> Self {
        Self {
            engine,
            provider,
            executor,
        }
    }

    /// Fetch up to `limit` messages matching `query`, evaluate every rule,
    /// and execute the resulting worklist.
    pub async fn run_once(&self, query: &str, limit: usize) -> BatchReport {
        let work = self
            .engine
            .fetch_actions(self.provider.as_ref(), query, limit)
            .await;

        if work.is_empty() {
            info!("No actions needed");
            return BatchReport::default();
        }

        self.executor.execute_all(&work).await
    }
}
