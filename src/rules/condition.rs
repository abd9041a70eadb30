//! Single-condition evaluation against a normalized message.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::message::NormalizedMessage;
use crate::rules::model::{Condition, DateUnit, Field, Operator};

/// Evaluate one condition against a message.
///
/// Fail-closed: unknown fields, unknown operators, unknown units, and
/// unparseable dates or numeric values all evaluate to `false` (with a
/// warning) rather than erroring.
pub fn evaluate(message: &NormalizedMessage, condition: &Condition) -> bool {
    // Text fields compare case-insensitively; the date header is kept
    // verbatim for the date operators.
    let field_value = match &condition.field {
        Field::From => message.from.to_lowercase(),
        Field::To => message.to.to_lowercase(),
        Field::Subject => message.subject.to_lowercase(),
        Field::Body => message.body.to_lowercase(),
        Field::DateReceived => message.date.clone(),
        Field::Unknown(name) => {
            warn!(field = %name, "Unknown condition field");
            return false;
        }
    };

    match &condition.operator {
        Operator::Contains => field_value.contains(&condition.value.to_lowercase()),
        Operator::NotContains => !field_value.contains(&condition.value.to_lowercase()),
        Operator::Equals => field_value == condition.value.to_lowercase(),
        Operator::NotEquals => field_value != condition.value.to_lowercase(),
        Operator::OlderThan => date_matches(&field_value, condition, true),
        Operator::NewerThan => date_matches(&field_value, condition, false),
        Operator::Unknown(name) => {
            warn!(operator = %name, "Unknown condition operator");
            false
        }
    }
}

/// `older == true` → message date strictly before now minus the window;
/// otherwise strictly after. The window is `value` days, or `value * 30`
/// days for months.
fn date_matches(date_str: &str, condition: &Condition, older: bool) -> bool {
    let message_date = match DateTime::parse_from_rfc2822(date_str) {
        Ok(dt) => dt,
        Err(e) => {
            warn!(date = %date_str, error = %e, "Failed to parse message date");
            return false;
        }
    };

    let amount: i64 = match condition.value.parse() {
        Ok(n) => n,
        Err(_) => {
            warn!(value = %condition.value, "Non-numeric value in date condition");
            return false;
        }
    };

    let days = match &condition.unit {
        DateUnit::Days => amount,
        DateUnit::Months => amount * 30,
        DateUnit::Unknown(name) => {
            warn!(unit = %name, "Unknown date unit");
            return false;
        }
    };

    // Threshold in the message's own timezone; the comparison is absolute.
    let threshold = Utc::now().with_timezone(message_date.offset()) - Duration::days(days);

    if older {
        message_date < threshold
    } else {
        message_date > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> NormalizedMessage {
        NormalizedMessage {
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
            from: "Test@Example.com".to_string(),
            to: "me@example.com".to_string(),
            subject: "Project Update".to_string(),
            body: "Please review the attached Report.".to_string(),
            date: "Fri, 10 Jan 2020 10:30:00 +0000".to_string(),
            labels: vec!["INBOX".to_string()],
            is_read: false,
            snippet: "Please review".to_string(),
        }
    }

    fn condition(field: &str, operator: &str, value: &str) -> Condition {
        Condition {
            field: Field::from(field.to_string()),
            operator: Operator::from(operator.to_string()),
            value: value.to_string(),
            unit: DateUnit::Days,
        }
    }

    #[test]
    fn contains_is_case_insensitive() {
        assert!(evaluate(&message(), &condition("from", "contains", "test@example")));
        assert!(evaluate(&message(), &condition("subject", "contains", "PROJECT")));
        assert!(!evaluate(&message(), &condition("from", "contains", "notfound")));
    }

    #[test]
    fn not_contains() {
        assert!(evaluate(&message(), &condition("body", "not_contains", "invoice")));
        assert!(!evaluate(&message(), &condition("body", "not_contains", "report")));
    }

    #[test]
    fn equals_and_not_equals() {
        assert!(evaluate(&message(), &condition("from", "equals", "test@example.com")));
        assert!(!evaluate(&message(), &condition("from", "equals", "other@example.com")));
        assert!(evaluate(&message(), &condition("from", "not_equals", "other@example.com")));
        assert!(!evaluate(&message(), &condition("from", "not_equals", "TEST@example.com")));
    }

    #[test]
    fn older_than_matches_old_message() {
        assert!(evaluate(&message(), &condition("date_received", "older_than", "30")));
    }

    #[test]
    fn newer_than_rejects_old_message() {
        assert!(!evaluate(&message(), &condition("date_received", "newer_than", "30")));
    }

    #[test]
    fn newer_than_matches_recent_message() {
        let mut msg = message();
        msg.date = (Utc::now() - Duration::days(3)).to_rfc2822();
        assert!(evaluate(&msg, &condition("date_received", "newer_than", "7")));
        assert!(!evaluate(&msg, &condition("date_received", "older_than", "7")));
    }

    #[test]
    fn months_unit_is_thirty_days() {
        let mut msg = message();
        msg.date = (Utc::now() - Duration::days(45)).to_rfc2822();

        let mut cond = condition("date_received", "older_than", "1");
        cond.unit = DateUnit::Months;
        assert!(evaluate(&msg, &cond));

        cond.value = "2".to_string();
        assert!(!evaluate(&msg, &cond));
    }

    #[test]
    fn malformed_date_fails_closed() {
        let mut msg = message();
        msg.date = "not a date".to_string();
        assert!(!evaluate(&msg, &condition("date_received", "older_than", "30")));
        assert!(!evaluate(&msg, &condition("date_received", "newer_than", "30")));
    }

    #[test]
    fn non_numeric_value_fails_closed() {
        assert!(!evaluate(&message(), &condition("date_received", "older_than", "soon")));
    }

    #[test]
    fn unknown_field_operator_and_unit_fail_closed() {
        assert!(!evaluate(&message(), &condition("cc", "contains", "test")));
        assert!(!evaluate(&message(), &condition("from", "matches", "test")));

        let mut cond = condition("date_received", "older_than", "1");
        cond.unit = DateUnit::Unknown("weeks".to_string());
        assert!(!evaluate(&message(), &cond));
    }
}
