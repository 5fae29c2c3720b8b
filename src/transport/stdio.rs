//! Stdio transport for the MCP server.
//!
//! Requests arrive one JSON object per line on stdin; each response is
//! written as one line on stdout and flushed immediately. Requests are
//! handled strictly one at a time.

use crate::mcp::{RequestRouter, RpcError, RpcRequest, RpcResponse};
use crate::transport::Transport;
use serde_json::Value;
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{debug, info, warn};

/// Why the line loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeExit {
    /// Input stream closed.
    Eof,
    /// Shutdown was requested between two requests.
    Shutdown,
}

/// Stdio transport implementation.
pub struct StdioTransport {
    router: Arc<RequestRouter>,
}

impl StdioTransport {
    pub fn new(router: Arc<RequestRouter>) -> Self {
        Self { router }
    }

    /// Handle one input line.
    ///
    /// Blank lines and lines that are not JSON produce no response. JSON that
    /// is not an object produces a generic error response with a null id.
    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Dropping input line that is not valid JSON");
                return None;
            }
        };

        match serde_json::from_value::<RpcRequest>(value) {
            Ok(request) => Some(self.router.dispatch(request).await),
            Err(e) => {
                warn!(error = %e, "Request is not a JSON object");
                Some(RpcResponse::failure(
                    Value::Null,
                    RpcError::generic(e.to_string()),
                ))
            }
        }
    }

    /// Run the line loop over arbitrary streams until EOF or `shutdown` resolves.
    ///
    /// `shutdown` is only observed while waiting for input, so a request that
    /// is already being handled always completes and gets its response.
    pub async fn serve<R, W, S>(
        &self,
        reader: R,
        mut writer: W,
        shutdown: S,
    ) -> io::Result<ServeExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        let mut lines = reader.lines();
        tokio::pin!(shutdown);

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = &mut shutdown => return Ok(ServeExit::Shutdown),
            };

            let Some(line) = line else {
                return Ok(ServeExit::Eof);
            };

            if let Some(response) = self.handle_line(&line).await {
                write_response(&mut writer, &response).await?;
            }
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &RpcResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(response).map_err(io::Error::other)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await
}

impl Transport for StdioTransport {
    async fn run(&self) -> io::Result<()> {
        info!("Starting MCP server with stdio transport");

        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();

        match self.serve(reader, writer, wait_for_signal()).await? {
            ServeExit::Eof => {
                info!("Stdin closed, stopping");
                Ok(())
            }
            ServeExit::Shutdown => {
                // The blocking stdin read cannot be interrupted, so leave directly
                info!("Shutdown signal received, exiting process");
                std::process::exit(0);
            }
        }
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
///
/// A handler that cannot be installed never fires.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
