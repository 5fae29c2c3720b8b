//! PostgreSQL MCP Server - Main entry point.
//!
//! Serves MCP (Model Context Protocol) tools for running SQL against named
//! PostgreSQL connections over stdio.

use pg_mcp_server::config::{Config, ConfigLoader};
use pg_mcp_server::db::executor::TLS_SUPPORTED;
use pg_mcp_server::mcp::RequestRouter;
use pg_mcp_server::transport::{StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Output goes to stderr; stdout carries protocol traffic only.
fn init_tracing(config: &Config, log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    let loaded = ConfigLoader::new(&config.settings).load();
    let server_config = loaded.server;

    if config.enable_logs {
        init_tracing(&config, config.effective_log_level(&server_config));
        for warning in &loaded.warnings {
            warn!(error = %warning, "Ignoring settings file");
        }
    } else {
        for warning in &loaded.warnings {
            eprintln!("Warning: {}", warning);
        }
    }

    info!(
        settings = %config.settings.display(),
        connections = server_config.connections.len(),
        default_connection = %server_config.default_connection,
        "Starting PostgreSQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    if !server_config
        .connections
        .contains(&server_config.default_connection)
    {
        warn!(
            default_connection = %server_config.default_connection,
            "Default connection is not configured; calls without a connection argument will fail"
        );
    }

    if server_config.enable_ssl && !TLS_SUPPORTED {
        warn!("enableSSL is set but this build has no TLS support; connecting without requiring SSL");
    }

    let router = Arc::new(RequestRouter::new(Arc::new(server_config)));
    let transport = StdioTransport::new(router);
    info!(transport = transport.name(), "Serving requests");

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
