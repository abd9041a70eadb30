//! Persistence — the action ledger and the fetched-message cache.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::{LedgerEntry, LedgerStatus, Store};
