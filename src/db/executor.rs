//! Query execution engine.
//!
//! Every call opens a fresh PostgreSQL session, runs one statement inside a
//! transaction, commits, and closes the session again. There is no pooling
//! and no retry: a failed attempt is reported, never repeated.
//!
//! # Result-set detection
//!
//! The statement is prepared first so its row description tells whether it
//! yields a result set. It is then run once as a plain statement over the
//! simple query protocol, which returns every value in text format.

use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionProfile, QueryOutcome, ServerConfig};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{Connection, Executor, Statement};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// `application_name` reported to the server for every session.
pub const APPLICATION_NAME: &str = "pg-mcp-server";

/// Whether this build can negotiate TLS. Without it `enableSSL` is ignored
/// and sessions use the driver's default SSL mode.
pub const TLS_SUPPORTED: bool = cfg!(any(feature = "tls-native", feature = "tls-rustls"));

/// Query executor that handles database query execution.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    config: Arc<ServerConfig>,
}

impl QueryExecutor {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self { config }
    }

    /// Execute `sql` against the named connection.
    ///
    /// Failures are returned as [`QueryOutcome::Failure`], never raised.
    pub async fn execute(&self, sql: &str, connection: &str) -> QueryOutcome {
        let start = Instant::now();
        let outcome = QueryOutcome::from(self.try_execute(sql, connection).await);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            QueryOutcome::Rows(rows) => {
                info!(connection, rows = rows.len(), elapsed_ms, "Query returned rows")
            }
            QueryOutcome::AffectedCount(n) => {
                info!(connection, rows_affected = n, elapsed_ms, "Statement executed")
            }
            QueryOutcome::Failure(err) => warn!(
                connection,
                kind = ?err.kind(),
                sql_state = err.sql_state(),
                error = %err,
                elapsed_ms,
                "Query failed"
            ),
        }
        outcome
    }

    async fn try_execute(&self, sql: &str, connection: &str) -> DbResult<QueryOutcome> {
        let profile = self
            .config
            .connections
            .get(connection)
            .ok_or_else(|| DbError::connection_not_found(connection))?;

        if sql.trim().is_empty() {
            return Err(DbError::syntax("can't execute an empty query", None));
        }

        let options = self.connect_options(profile)?;
        let mut conn = self.connect(profile, &options).await?;

        debug!(connection, sql = %sql, "Executing statement");
        let result = run_statement(&mut conn, sql).await;

        close_session(conn, connection).await;
        result
    }

    /// Build driver options from a profile.
    ///
    /// Empty user, password or database fields are left to the driver's
    /// defaults (PG* environment variables, then the OS user).
    pub fn connect_options(&self, profile: &ConnectionProfile) -> DbResult<PgConnectOptions> {
        let port = profile.port.resolve()?;
        let mut options = PgConnectOptions::new()
            .host(&profile.host)
            .port(port)
            .application_name(APPLICATION_NAME);

        if !profile.user.is_empty() {
            options = options.username(&profile.user);
        }
        if !profile.password.is_empty() {
            options = options.password(&profile.password);
        }
        if !profile.database.is_empty() {
            options = options.database(&profile.database);
        }
        if self.config.enable_ssl && TLS_SUPPORTED {
            options = options.ssl_mode(PgSslMode::Require);
        }
        Ok(options)
    }

    async fn connect(
        &self,
        profile: &ConnectionProfile,
        options: &PgConnectOptions,
    ) -> DbResult<PgConnection> {
        debug!(
            connection = %profile.name,
            target = %profile.display_target(),
            "Opening database session"
        );

        let connecting = PgConnection::connect_with(options);
        let result = match self.config.connect_timeout() {
            Some(limit) => timeout(limit, connecting)
                .await
                .map_err(|_| DbError::connection("timeout expired"))?,
            None => connecting.await,
        };
        result.map_err(DbError::from_connect)
    }
}

/// Run one statement in a transaction and commit it.
///
/// On error the transaction is dropped, which rolls it back.
async fn run_statement(conn: &mut PgConnection, sql: &str) -> DbResult<QueryOutcome> {
    let mut tx = conn.begin().await?;

    let statement = (&mut *tx).prepare(sql).await?;
    let outcome = if statement.columns().is_empty() {
        let result = (&mut *tx).execute(sql).await?;
        QueryOutcome::AffectedCount(result.rows_affected())
    } else {
        let rows = (&mut *tx).fetch_all(sql).await?;
        QueryOutcome::Rows(rows.iter().map(RowToJson::to_json_map).collect())
    };

    tx.commit().await?;
    Ok(outcome)
}

async fn close_session(conn: PgConnection, connection: &str) {
    match conn.close().await {
        Ok(()) => debug!(connection, "Closed database session"),
        Err(e) => debug!(connection, error = %e, "Session closed uncleanly"),
    }
}
