//! Transport layer for the MCP server.
//!
//! The server speaks line-delimited JSON-RPC over standard input/output.

pub mod stdio;

pub use stdio::{ServeExit, StdioTransport};

use std::future::Future;

/// Trait for MCP transport implementations.
///
/// Transports handle the low-level communication between the MCP server
/// and clients, abstracting away the protocol details.
pub trait Transport: Send + Sync {
    /// Start the transport and begin handling requests.
    ///
    /// This method should block until the transport is shut down.
    fn run(&self) -> impl Future<Output = std::io::Result<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}
