//! JSON-RPC 2.0 message types used on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server identity announced by `initialize`.
pub const SERVER_NAME: &str = "postgres-mcp";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// An incoming request. `id` is opaque and echoed back unchanged.
///
/// `method` is kept as raw JSON: a missing or non-string method is still a
/// request, answered with "method not found".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: Some(id.into()),
            method: Some(Value::String(method.into())),
            params,
        }
    }

    /// Request id for the response; absent ids become `null`.
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }

    /// The method name, when it is a string.
    pub fn method_name(&self) -> Option<&str> {
        self.method.as_ref().and_then(Value::as_str)
    }

    /// The method as shown in error messages: `None` when missing or null,
    /// JSON text when not a string.
    pub fn method_label(&self) -> String {
        match &self.method {
            None | Some(Value::Null) => "None".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Error object of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    /// Unknown method.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Any other failure while handling a line.
    pub const GENERIC: i32 = -1;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(Self::GENERIC, message)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for RpcError {}

/// An outgoing response. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_id_or_params() {
        let req: RpcRequest = serde_json::from_str(r#"{"method":"initialize"}"#).unwrap();
        assert_eq!(req.id, None);
        assert_eq!(req.params, None);
        assert_eq!(req.response_id(), Value::Null);
    }

    #[test]
    fn test_request_without_method_decodes() {
        let req: RpcRequest = serde_json::from_str(r#"{"id":1}"#).unwrap();
        assert_eq!(req.method_name(), None);
        assert_eq!(req.method_label(), "None");
    }

    #[test]
    fn test_non_string_method_label() {
        let req: RpcRequest = serde_json::from_str(r#"{"id":1,"method":7}"#).unwrap();
        assert_eq!(req.method_name(), None);
        assert_eq!(req.method_label(), "7");

        let req: RpcRequest = serde_json::from_str(r#"{"id":1,"method":null}"#).unwrap();
        assert_eq!(req.method_label(), "None");
    }

    #[test]
    fn test_non_object_is_not_a_request() {
        assert!(serde_json::from_str::<RpcRequest>("[1,2]").is_err());
        assert!(serde_json::from_str::<RpcRequest>("42").is_err());
    }

    #[test]
    fn test_request_id_kept_verbatim() {
        let req: RpcRequest =
            serde_json::from_str(r#"{"id":"abc-1","method":"tools/list"}"#).unwrap();
        assert_eq!(req.response_id(), json!("abc-1"));
    }

    #[test]
    fn test_success_serialization_omits_error() {
        let resp = RpcResponse::success(json!(7), json!({"ok": true}));
        let text = serde_json::to_string(&resp).unwrap();
        assert_eq!(text, r#"{"jsonrpc":"2.0","id":7,"result":{"ok":true}}"#);
    }

    #[test]
    fn test_failure_serialization_keeps_null_id() {
        let resp = RpcResponse::failure(Value::Null, RpcError::method_not_found("foo"));
        let text = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            text,
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32601,"message":"Method not found: foo"}}"#
        );
    }

    #[test]
    fn test_response_round_trip() {
        let resp = RpcResponse::success(
            json!(1),
            json!({"content": [{"type": "text", "text": "[]"}]}),
        );
        let text = serde_json::to_string(&resp).unwrap();
        let parsed: RpcResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, resp);
    }
}
