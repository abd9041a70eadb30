//! Runtime configuration for the CLI.

use std::path::PathBuf;

/// Settings for one processing run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Rule document (JSON).
    pub rules_path: PathBuf,
    /// Ledger + message-cache database file.
    pub db_path: PathBuf,
    /// Mailbox snapshot file.
    pub mailbox_path: PathBuf,
    /// Mailbox search query for the fetch.
    pub query: String,
    /// Maximum messages fetched per run.
    pub fetch_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("./rules.json"),
            db_path: PathBuf::from("./data/mailsieve.db"),
            mailbox_path: PathBuf::from("./data/mailbox.json"),
            query: "in:all".to_string(),
            fetch_limit: 50,
        }
    }
}

impl Config {
    /// Build from `MAILSIEVE_*` environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            rules_path: std::env::var("MAILSIEVE_RULES")
                .map(PathBuf::from)
                .unwrap_or(defaults.rules_path),
            db_path: std::env::var("MAILSIEVE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            mailbox_path: std::env::var("MAILSIEVE_MAILBOX")
                .map(PathBuf::from)
                .unwrap_or(defaults.mailbox_path),
            query: std::env::var("MAILSIEVE_QUERY").unwrap_or(defaults.query),
            fetch_limit: std::env::var("MAILSIEVE_FETCH_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.query, "in:all");
        assert_eq!(config.fetch_limit, 50);
        assert_eq!(config.rules_path, PathBuf::from("./rules.json"));
    }
}
