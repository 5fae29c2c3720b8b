//! Data models for the PostgreSQL MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{ConnectionProfile, ConnectionRegistry, ConnectionSummary, Port, ServerConfig};
pub use query::{QueryOutcome, Row};
