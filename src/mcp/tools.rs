//! Tool catalog and tool result rendering.
//!
//! Every tool call answers with a single text content item. Query payloads
//! are always valid JSON; the unknown-tool payload is plain text.

use crate::models::{ConnectionRegistry, QueryOutcome};
use serde::Serialize;
use serde_json::{Value, json};

pub const TOOL_LIST_CONNECTIONS: &str = "list_connections";
pub const TOOL_QUERY: &str = "query";

/// Descriptor returned by `tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// The fixed tool catalog. The `connection` description names the current default.
pub fn catalog(default_connection: &str) -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: TOOL_LIST_CONNECTIONS,
            description: "List all available database connections",
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDescriptor {
            name: TOOL_QUERY,
            description: "Execute a SQL query against PostgreSQL",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": "The SQL query to execute"
                    },
                    "connection": {
                        "type": "string",
                        "description": format!("Connection name (default: {})", default_connection)
                    }
                },
                "required": ["sql"]
            }),
        },
    ]
}

/// Wrap a payload string as the `tools/call` result body.
pub fn text_content(text: impl Into<String>) -> Value {
    json!({
        "content": [{"type": "text", "text": text.into()}]
    })
}

/// Pretty-printed connection summaries, password omitted.
pub fn render_connections(registry: &ConnectionRegistry) -> String {
    pretty(&registry.summaries())
}

/// Render a query outcome as the tool's JSON text payload.
pub fn render_outcome(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Rows(rows) => pretty(rows),
        QueryOutcome::AffectedCount(n) => pretty(&json!({
            "result": format!("Query executed. Rows affected: {}", n)
        })),
        QueryOutcome::Failure(err) => pretty(&json!({ "error": err.to_string() })),
    }
}

pub fn unknown_tool(name: &str) -> String {
    format!("Unknown tool: {}", name)
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    // Maps with string keys, strings and numbers cannot fail to serialize
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize tool payload");
        json!({ "error": e.to_string() }).to_string()
    })
}
