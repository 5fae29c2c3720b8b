//! Integration tests for the stdio line loop, driven over in-memory pipes.

use pg_mcp_server::mcp::{RequestRouter, RpcError};
use pg_mcp_server::models::{ConnectionProfile, ConnectionRegistry, ServerConfig};
use pg_mcp_server::transport::{ServeExit, StdioTransport};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, BufReader};

fn transport() -> StdioTransport {
    let registry: ConnectionRegistry =
        std::iter::once(ConnectionProfile::new("default", "localhost", 5432, "u", "p", "d"))
            .collect();
    let router = RequestRouter::new(Arc::new(ServerConfig::new(registry)));
    StdioTransport::new(Arc::new(router))
}

/// Feed `input` to the loop and collect every output line as JSON.
async fn run_lines(input: &str) -> (ServeExit, Vec<Value>) {
    let transport = transport();
    let (mut output_rx, output_tx) = tokio::io::duplex(64 * 1024);

    let exit = transport
        .serve(
            BufReader::new(input.as_bytes()),
            output_tx,
            std::future::pending::<()>(),
        )
        .await
        .unwrap();

    let mut raw = String::new();
    output_rx.read_to_string(&mut raw).await.unwrap();
    let lines = raw
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (exit, lines)
}

#[tokio::test]
async fn test_one_response_per_request_in_order() {
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"list_connections","arguments":{}}}"#,
        "\n",
    );
    let (exit, responses) = run_lines(input).await;
    assert_eq!(exit, ServeExit::Eof);
    assert_eq!(responses.len(), 3);
    let ids: Vec<_> = responses.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
    assert!(responses.iter().all(|r| r["jsonrpc"] == "2.0"));
}

#[tokio::test]
async fn test_blank_and_malformed_lines_are_silent() {
    let input = "\n   \n{\"id\":1,\"method\":\n{\"id\":2,\"method\":\"initialize\"}\n";
    let (_, responses) = run_lines(input).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], json!(2));
}

#[tokio::test]
async fn test_non_object_json_gets_generic_error_with_null_id() {
    let input = "42\n[1,2]\n\"initialize\"\n";
    let (_, responses) = run_lines(input).await;
    assert_eq!(responses.len(), 3);
    for response in &responses {
        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["error"]["code"], json!(RpcError::GENERIC));
        assert!(response.get("result").is_none());
    }
}

#[tokio::test]
async fn test_missing_or_non_string_method_is_method_not_found() {
    let input = "{\"id\":5}\n{\"id\":6,\"method\":7}\n{\"id\":7,\"method\":null}\n";
    let (_, responses) = run_lines(input).await;
    assert_eq!(responses.len(), 3);

    let ids: Vec<_> = responses.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(5), json!(6), json!(7)]);
    for response in &responses {
        assert_eq!(response["error"]["code"], json!(RpcError::METHOD_NOT_FOUND));
    }
    assert_eq!(responses[0]["error"]["message"], "Method not found: None");
    assert_eq!(responses[1]["error"]["message"], "Method not found: 7");
    assert_eq!(responses[2]["error"]["message"], "Method not found: None");
}

#[tokio::test]
async fn test_last_line_without_newline_is_handled() {
    let (_, responses) = run_lines(r#"{"id":"tail","method":"initialize"}"#).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], "tail");
}

#[tokio::test]
async fn test_unknown_method_over_the_wire() {
    let (_, responses) = run_lines("{\"id\":9,\"method\":\"ping\"}\n").await;
    assert_eq!(responses[0]["error"]["code"], json!(-32601));
    assert_eq!(responses[0]["error"]["message"], "Method not found: ping");
}
