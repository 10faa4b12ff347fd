//! Persistence layer for agents, document chunks, and compilation jobs.
//!
//! Structured the way the teacher's `storage` module is (trait + schema +
//! `SQLite` implementation split across files), but pooled via `r2d2`
//! instead of a single connection, since this platform has genuine
//! concurrent multi-tenant access (see SPEC_FULL.md §5).

mod schema;
mod sqlite;
mod traits;

pub use schema::CURRENT_SCHEMA_VERSION;
pub use sqlite::SqliteStore;
pub use traits::{Store, StoreStats};

/// Default database path, mirroring the teacher's `DEFAULT_DB_PATH` convention.
pub const DEFAULT_DB_PATH: &str = "mexar.db";
