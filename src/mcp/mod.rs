//! MCP protocol handling.
//!
//! This module provides the JSON-RPC message types, the tool catalog, and
//! the request router that maps methods and tools to their handlers.

pub mod protocol;
pub mod router;
pub mod tools;

pub use protocol::{RpcError, RpcRequest, RpcResponse};
pub use router::RequestRouter;
