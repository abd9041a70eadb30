//! Typed rule-document model.
//!
//! Unknown strings in a rule document deserialize into `Unknown(...)`
//! variants instead of failing the load: evaluation treats them as
//! non-matching, and the executor records unknown action types as failed.

use serde::{Deserialize, Serialize};

use crate::mailbox::{INBOX, TRASH};

/// Message field a condition inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Field {
    From,
    To,
    Subject,
    Body,
    DateReceived,
    /// Unrecognized field name, kept verbatim. Never matches.
    Unknown(String),
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        match s.as_str() {
            "from" => Self::From,
            "to" => Self::To,
            "subject" => Self::Subject,
            "body" => Self::Body,
            "date_received" => Self::DateReceived,
            _ => Self::Unknown(s),
        }
    }
}

impl From<Field> for String {
    fn from(field: Field) -> Self {
        match field {
            Field::From => "from".to_string(),
            Field::To => "to".to_string(),
            Field::Subject => "subject".to_string(),
            Field::Body => "body".to_string(),
            Field::DateReceived => "date_received".to_string(),
            Field::Unknown(s) => s,
        }
    }
}

/// Comparison applied to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    OlderThan,
    NewerThan,
    /// Unrecognized operator, kept verbatim. Never matches.
    Unknown(String),
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "older_than" => Self::OlderThan,
            "newer_than" => Self::NewerThan,
            _ => Self::Unknown(s),
        }
    }
}

impl From<Operator> for String {
    fn from(operator: Operator) -> Self {
        match operator {
            Operator::Contains => "contains".to_string(),
            Operator::NotContains => "not_contains".to_string(),
            Operator::Equals => "equals".to_string(),
            Operator::NotEquals => "not_equals".to_string(),
            Operator::OlderThan => "older_than".to_string(),
            Operator::NewerThan => "newer_than".to_string(),
            Operator::Unknown(s) => s,
        }
    }
}

/// Aggregation policy over a rule's conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Predicate {
    #[default]
    All,
    Any,
    /// Unrecognized predicate, kept verbatim. The rule never matches.
    Unknown(String),
}

impl From<String> for Predicate {
    fn from(s: String) -> Self {
        match s.as_str() {
            "all" => Self::All,
            "any" => Self::Any,
            _ => Self::Unknown(s),
        }
    }
}

impl From<Predicate> for String {
    fn from(predicate: Predicate) -> Self {
        match predicate {
            Predicate::All => "all".to_string(),
            Predicate::Any => "any".to_string(),
            Predicate::Unknown(s) => s,
        }
    }
}

/// Unit for the date operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DateUnit {
    #[default]
    Days,
    Months,
    /// Unrecognized unit, kept verbatim. The condition never matches.
    Unknown(String),
}

impl From<String> for DateUnit {
    fn from(s: String) -> Self {
        match s.as_str() {
            "days" => Self::Days,
            "months" => Self::Months,
            _ => Self::Unknown(s),
        }
    }
}

impl From<DateUnit> for String {
    fn from(unit: DateUnit) -> Self {
        match unit {
            DateUnit::Days => "days".to_string(),
            DateUnit::Months => "months".to_string(),
            DateUnit::Unknown(s) => s,
        }
    }
}

/// Kind of mailbox mutation a rule requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    MarkAsRead,
    MarkAsUnread,
    MoveMessage,
    /// Unrecognized action type, kept verbatim. Execution records it as
    /// failed without touching the mailbox.
    Unknown(String),
}

impl From<String> for ActionKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "mark_as_read" => Self::MarkAsRead,
            "mark_as_unread" => Self::MarkAsUnread,
            "move_message" => Self::MoveMessage,
            _ => Self::Unknown(s),
        }
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::MarkAsRead => "mark_as_read".to_string(),
            ActionKind::MarkAsUnread => "mark_as_unread".to_string(),
            ActionKind::MoveMessage => "move_message".to_string(),
            ActionKind::Unknown(s) => s,
        }
    }
}

/// A single predicate over one message field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: Field,
    pub operator: Operator,
    pub value: String,
    /// Unit for the date operators. Ignored by the string operators.
    #[serde(default)]
    pub unit: DateUnit,
}

/// One mailbox action requested by a matching rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Target folder for `move_message`. Defaults to the inbox.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

impl ActionSpec {
    /// Target folder, defaulting to INBOX.
    pub fn folder(&self) -> &str {
        self.folder.as_deref().unwrap_or(INBOX)
    }

    /// Ledger key identifying this action on a message.
    ///
    /// Folder moves encode the destination so that moves to different
    /// folders stay distinct ledger entries. INBOX and TRASH are matched
    /// case-insensitively; other folder names keep their spelling.
    pub fn ledger_key(&self) -> String {
        match &self.kind {
            ActionKind::MarkAsRead => "mark_as_read".to_string(),
            ActionKind::MarkAsUnread => "mark_as_unread".to_string(),
            ActionKind::MoveMessage => {
                let folder = self.folder();
                if folder.eq_ignore_ascii_case(INBOX) {
                    "move_to_inbox".to_string()
                } else if folder.eq_ignore_ascii_case(TRASH) {
                    "move_to_trash".to_string()
                } else {
                    format!("move_to_{folder}")
                }
            }
            ActionKind::Unknown(raw) => raw.clone(),
        }
    }
}

fn default_rule_name() -> String {
    "Unknown Rule".to_string()
}

/// A named rule: conditions aggregated under a predicate, plus the
/// actions to apply on a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default = "default_rule_name")]
    pub name: String,
    #[serde(default)]
    pub predicate: Predicate,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

/// Top-level rule document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Unit of work for the executor: one action from one matching rule,
/// bound to one message.
#[derive(Debug, Clone)]
pub struct ActionWorkItem {
    pub email_id: String,
    pub rule_name: String,
    pub action: ActionSpec,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rule_document() {
        let doc = r#"{
            "rules": [{
                "name": "Old newsletters",
                "predicate": "any",
                "conditions": [
                    {"field": "from", "operator": "contains", "value": "newsletter"},
                    {"field": "date_received", "operator": "older_than", "value": "2", "unit": "months"}
                ],
                "actions": [
                    {"type": "mark_as_read"},
                    {"type": "move_message", "folder": "Newsletters"}
                ]
            }]
        }"#;

        let set: RuleSet = serde_json::from_str(doc).unwrap();
        assert_eq!(set.rules.len(), 1);

        let rule = &set.rules[0];
        assert_eq!(rule.name, "Old newsletters");
        assert_eq!(rule.predicate, Predicate::Any);
        assert_eq!(rule.conditions[0].field, Field::From);
        assert_eq!(rule.conditions[0].operator, Operator::Contains);
        assert_eq!(rule.conditions[1].unit, DateUnit::Months);
        assert_eq!(rule.actions[0].kind, ActionKind::MarkAsRead);
        assert_eq!(rule.actions[1].folder.as_deref(), Some("Newsletters"));
    }

    #[test]
    fn applies_defaults() {
        let doc = r#"{
            "rules": [{
                "conditions": [{"field": "subject", "operator": "equals", "value": "hi"}],
                "actions": [{"type": "move_message"}]
            }]
        }"#;

        let set: RuleSet = serde_json::from_str(doc).unwrap();
        let rule = &set.rules[0];
        assert_eq!(rule.name, "Unknown Rule");
        assert_eq!(rule.predicate, Predicate::All);
        assert_eq!(rule.conditions[0].unit, DateUnit::Days);
        assert_eq!(rule.actions[0].folder(), INBOX);
    }

    #[test]
    fn unknown_strings_are_preserved() {
        let doc = r#"{
            "rules": [{
                "name": "odd",
                "predicate": "most",
                "conditions": [{"field": "cc", "operator": "matches", "value": "x", "unit": "weeks"}],
                "actions": [{"type": "archive"}]
            }]
        }"#;

        let set: RuleSet = serde_json::from_str(doc).unwrap();
        let rule = &set.rules[0];
        assert_eq!(rule.predicate, Predicate::Unknown("most".to_string()));
        assert_eq!(rule.conditions[0].field, Field::Unknown("cc".to_string()));
        assert_eq!(rule.conditions[0].operator, Operator::Unknown("matches".to_string()));
        assert_eq!(rule.conditions[0].unit, DateUnit::Unknown("weeks".to_string()));
        assert_eq!(rule.actions[0].kind, ActionKind::Unknown("archive".to_string()));
    }

    #[test]
    fn ledger_keys() {
        let read = ActionSpec { kind: ActionKind::MarkAsRead, folder: None };
        assert_eq!(read.ledger_key(), "mark_as_read");

        let unread = ActionSpec { kind: ActionKind::MarkAsUnread, folder: None };
        assert_eq!(unread.ledger_key(), "mark_as_unread");

        let inbox = ActionSpec { kind: ActionKind::MoveMessage, folder: None };
        assert_eq!(inbox.ledger_key(), "move_to_inbox");

        // INBOX/TRASH are case-insensitive; other folders keep their case.
        let trash = ActionSpec { kind: ActionKind::MoveMessage, folder: Some("trash".to_string()) };
        assert_eq!(trash.ledger_key(), "move_to_trash");

        let label = ActionSpec { kind: ActionKind::MoveMessage, folder: Some("Work/Clients".to_string()) };
        assert_eq!(label.ledger_key(), "move_to_Work/Clients");

        let unknown = ActionSpec { kind: ActionKind::Unknown("archive".to_string()), folder: None };
        assert_eq!(unknown.ledger_key(), "archive");
    }
}
