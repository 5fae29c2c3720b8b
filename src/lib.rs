//! PostgreSQL MCP Server Library
//!
//! This library exposes PostgreSQL query execution to MCP (Model Context
//! Protocol) clients over line-delimited JSON-RPC on stdio.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod transport;

pub use config::{Config, ConfigLoader};
pub use db::QueryExecutor;
pub use error::DbError;
pub use mcp::RequestRouter;
