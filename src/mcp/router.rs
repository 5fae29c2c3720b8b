//! JSON-RPC method routing.
//!
//! Methods and tools are looked up by exact name in two tables built once at
//! construction. Each dispatch depends only on the request and the shared,
//! read-only [`ServerConfig`].

use crate::db::QueryExecutor;
use crate::mcp::protocol::{
    METHOD_INITIALIZE, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, PROTOCOL_VERSION, RpcError,
    RpcRequest, RpcResponse, SERVER_NAME,
};
use crate::mcp::tools::{self, TOOL_LIST_CONNECTIONS, TOOL_QUERY};
use crate::models::ServerConfig;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Handler for one JSON-RPC method. Receives the raw `params` value.
type MethodHandler =
    for<'a> fn(&'a RequestRouter, Option<&'a Value>) -> BoxFuture<'a, Result<Value, RpcError>>;

/// Handler for one tool. Receives the call's `arguments` and returns the text payload.
type ToolHandler = for<'a> fn(&'a RequestRouter, &'a Map<String, Value>) -> BoxFuture<'a, String>;

pub struct RequestRouter {
    config: Arc<ServerConfig>,
    executor: QueryExecutor,
    methods: HashMap<&'static str, MethodHandler>,
    tools: HashMap<&'static str, ToolHandler>,
}

impl RequestRouter {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        let mut methods: HashMap<&'static str, MethodHandler> = HashMap::new();
        methods.insert(METHOD_INITIALIZE, handle_initialize);
        methods.insert(METHOD_TOOLS_LIST, handle_tools_list);
        methods.insert(METHOD_TOOLS_CALL, handle_tools_call);

        let mut tools: HashMap<&'static str, ToolHandler> = HashMap::new();
        tools.insert(TOOL_LIST_CONNECTIONS, tool_list_connections);
        tools.insert(TOOL_QUERY, tool_query);

        Self {
            executor: QueryExecutor::new(config.clone()),
            config,
            methods,
            tools,
        }
    }

    /// Produce the response for one request. Never fails: unknown methods
    /// become `-32601` error responses, tool failures become text payloads.
    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        let id = request.response_id();

        let handler = request
            .method_name()
            .and_then(|name| self.methods.get(name));
        let Some(handler) = handler else {
            let method = request.method_label();
            warn!(method = %method, "Method not found");
            return RpcResponse::failure(id, RpcError::method_not_found(&method));
        };

        debug!(method = %request.method_label(), id = %id, "Dispatching request");
        match handler(self, request.params.as_ref()).await {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::failure(id, error),
        }
    }

    /// Effective connection: the `connection` argument when present and
    /// non-empty, the configured default otherwise.
    fn resolve_connection<'a>(&'a self, arguments: &'a Map<String, Value>) -> &'a str {
        arguments
            .get("connection")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.config.default_connection.as_str())
    }
}

fn handle_initialize<'a>(
    _router: &'a RequestRouter,
    _params: Option<&'a Value>,
) -> BoxFuture<'a, Result<Value, RpcError>> {
    async move {
        Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        }))
    }
    .boxed()
}

fn handle_tools_list<'a>(
    router: &'a RequestRouter,
    _params: Option<&'a Value>,
) -> BoxFuture<'a, Result<Value, RpcError>> {
    async move {
        let catalog = tools::catalog(&router.config.default_connection);
        Ok(json!({ "tools": catalog }))
    }
    .boxed()
}

fn handle_tools_call<'a>(
    router: &'a RequestRouter,
    params: Option<&'a Value>,
) -> BoxFuture<'a, Result<Value, RpcError>> {
    async move {
        let params = params.and_then(Value::as_object);
        let name = tool_name(params.and_then(|p| p.get("name")));
        let arguments = params
            .and_then(|p| p.get("arguments"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let text = match router.tools.get(name.as_str()) {
            Some(tool) => tool(router, &arguments).await,
            None => {
                warn!(tool = %name, "Unknown tool");
                tools::unknown_tool(&name)
            }
        };
        Ok(tools::text_content(text))
    }
    .boxed()
}

/// Tool name as text. Missing or null names are empty; non-string names
/// are rendered as JSON.
fn tool_name(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn tool_list_connections<'a>(
    router: &'a RequestRouter,
    _arguments: &'a Map<String, Value>,
) -> BoxFuture<'a, String> {
    async move { tools::render_connections(&router.config.connections) }.boxed()
}

fn tool_query<'a>(
    router: &'a RequestRouter,
    arguments: &'a Map<String, Value>,
) -> BoxFuture<'a, String> {
    async move {
        let sql = arguments
            .get("sql")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let connection = router.resolve_connection(arguments);
        let outcome = router.executor.execute(sql, connection).await;
        tools::render_outcome(&outcome)
    }
    .boxed()
}
