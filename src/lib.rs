//! Mailsieve — declarative mailbox rules with an idempotent action ledger.
//!
//! One processing pass flows through:
//! 1. [`source::MessageProvider::fetch`] — normalized messages, cached in the store
//! 2. [`rules::RuleEngine`] — evaluates every rule, emits an action worklist
//! 3. [`executor::ActionExecutor`] — applies each work item at most once,
//!    consulting and updating the ledger
//!
//! Mailbox I/O (auth, transport, parsing) lives behind the [`mailbox::Mailbox`]
//! trait; the core never talks to a mail API directly.

pub mod config;
pub mod error;
pub mod executor;
pub mod mailbox;
pub mod message;
pub mod processor;
pub mod rules;
pub mod source;
pub mod store;
