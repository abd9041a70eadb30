//! Rule loading and evaluation — produces the action worklist.

use std::path::Path;

use tracing::{error, info, warn};

use crate::error::ConfigError;
use crate::message::NormalizedMessage;
use crate::rules::condition;
use crate::rules::model::{ActionWorkItem, Predicate, Rule, RuleSet};
use crate::source::MessageProvider;

/// Evaluates rules in load order against normalized messages.
///
/// Rules are loaded once per engine instance and immutable for the run.
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Engine with no rules — every pass is a no-op.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Load rules from a JSON document on disk.
    ///
    /// A missing or malformed file degrades to an empty rule set so a bad
    /// config never blocks a run.
    pub fn from_file(path: &Path) -> Self {
        match Self::try_from_file(path) {
            Ok(engine) => engine,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load rules, continuing with empty rule set");
                Self::empty()
            }
        }
    }

    /// Strict variant of [`Self::from_file`] for callers that want
    /// load-time errors instead of degradation.
    pub fn try_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let set: RuleSet =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        info!(count = set.rules.len(), path = %path.display(), "Loaded rules");
        Ok(Self::new(set.rules))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Whether a rule matches a message.
    ///
    /// A rule with no conditions never matches, regardless of predicate.
    /// An unknown predicate never matches.
    pub fn evaluate_rule(&self, message: &NormalizedMessage, rule: &Rule) -> bool {
        if rule.conditions.is_empty() {
            return false;
        }

        let results: Vec<bool> = rule
            .conditions
            .iter()
            .map(|c| condition::evaluate(message, c))
            .collect();

        match &rule.predicate {
            Predicate::All => results.iter().all(|r| *r),
            Predicate::Any => results.iter().any(|r| *r),
            Predicate::Unknown(name) => {
                warn!(predicate = %name, rule = %rule.name, "Unknown predicate");
                false
            }
        }
    }

    /// All actions to apply to one message, in rule declaration order with
    /// each rule's actions kept in their declared order.
    pub fn actions_for_message(&self, message: &NormalizedMessage) -> Vec<ActionWorkItem> {
        let mut work = Vec::new();

        for rule in &self.rules {
            if self.evaluate_rule(message, rule) {
                info!(rule = %rule.name, subject = %message.subject, "Rule matched");
                for action in &rule.actions {
                    work.push(ActionWorkItem {
                        email_id: message.id.clone(),
                        rule_name: rule.name.clone(),
                        action: action.clone(),
                    });
                }
            }
        }

        work
    }

    /// Fetch up to `limit` messages and build the combined worklist in
    /// fetch order. A fetch failure degrades to an empty worklist.
    pub async fn fetch_actions(
        &self,
        provider: &dyn MessageProvider,
        query: &str,
        limit: usize,
    ) -> Vec<ActionWorkItem> {
        let messages = match provider.fetch(query, limit).await {
            Ok(messages) => messages,
            Err(e) => {
                error!(error = %e, "Failed to fetch messages");
                return Vec::new();
            }
        };

        info!(
            messages = messages.len(),
            rules = self.rules.len(),
            "Evaluating fetched messages"
        );

        let mut work = Vec::new();
        for message in &messages {
            work.extend(self.actions_for_message(message));
        }

        info!(actions = work.len(), "Generated action worklist");
        work
    }
}
