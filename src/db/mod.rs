//! Database access layer.
//!
//! This module provides:
//! - Query execution over one-shot PostgreSQL sessions
//! - Type mappings from PostgreSQL values to JSON

pub mod executor;
pub mod types;

pub use executor::QueryExecutor;
pub use types::RowToJson;
