//! SupportDesk Store: SQLite persistence with FTS5 keyword search.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::*;
