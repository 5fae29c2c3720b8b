//! Error types for the PostgreSQL MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Query failures never cross the tool boundary as protocol errors: they are
//! rendered into the tool's text payload, so every `Display` string here is
//! written for the AI assistant reading that payload.

use thiserror::Error;

/// Category of a failed query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown connection name or malformed profile field.
    Configuration,
    /// Network, authentication or session-establishment failure.
    Connection,
    /// Statement rejected by the engine.
    Syntax,
    /// Any other engine-reported fault.
    Engine,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("Connection '{name}' not found")]
    ConnectionNotFound { name: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Database connection error: {message}")]
    Connection { message: String },

    #[error("SQL syntax error: {message}")]
    Syntax {
        message: String,
        /// e.g., "42601" for a syntax error
        sql_state: Option<String>,
    },

    #[error("Database error: {message}")]
    Database {
        message: String,
        sql_state: Option<String>,
    },
}

impl DbError {
    /// Create a connection not found error.
    pub fn connection_not_found(name: impl Into<String>) -> Self {
        Self::ConnectionNotFound { name: name.into() }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a syntax error with optional SQL state.
    pub fn syntax(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionNotFound { .. } | Self::Configuration { .. } => {
                ErrorKind::Configuration
            }
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::Database { .. } => ErrorKind::Engine,
        }
    }

    /// SQLSTATE reported by the server, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Syntax { sql_state, .. } | Self::Database { sql_state, .. } => {
                sql_state.as_deref()
            }
            _ => None,
        }
    }

    /// Classify a failure raised while establishing a session.
    ///
    /// Anything other than a driver configuration problem is a connection
    /// error here, including authentication failures the server reports.
    pub fn from_connect(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::configuration(msg.to_string()),
            sqlx::Error::Database(db_err) => DbError::connection(db_err.message()),
            other => DbError::connection(other.to_string()),
        }
    }
}

/// SQLSTATE classes PostgreSQL uses for operational failures
/// (connection exception, insufficient resources, operator intervention, ...).
const CONNECTION_CLASSES: &[&str] = &["08", "53", "54", "55", "57", "58"];

/// SQLSTATE classes for statements the engine refuses to run as written
/// (syntax or access rule violation, invalid statement/cursor/schema names).
const SYNTAX_CLASSES: &[&str] = &["42", "26", "34", "3D", "3F"];

/// Classify a SQLSTATE code into an error category.
pub fn classify_sql_state(code: &str) -> ErrorKind {
    let class = code.get(..2).unwrap_or(code);
    if CONNECTION_CLASSES.contains(&class) {
        ErrorKind::Connection
    } else if SYNTAX_CLASSES.contains(&class) {
        ErrorKind::Syntax
    } else {
        ErrorKind::Engine
    }
}

/// Convert sqlx errors raised during statement execution to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::configuration(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                let message = db_err.message().to_string();
                match code.as_deref().map(classify_sql_state) {
                    Some(ErrorKind::Connection) => DbError::connection(message),
                    Some(ErrorKind::Syntax) => DbError::syntax(message, code),
                    _ => DbError::database(message, code),
                }
            }
            sqlx::Error::Io(io_err) => DbError::connection(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => DbError::connection(format!("TLS error: {}", tls_err)),
            sqlx::Error::Protocol(msg) => DbError::connection(format!("Protocol error: {}", msg)),
            other @ (sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed) => DbError::connection(other.to_string()),
            sqlx::Error::TypeNotFound { type_name } => {
                DbError::database(format!("Type not found: {}", type_name), None)
            }
            sqlx::Error::ColumnDecode { index, source } => DbError::database(
                format!("Failed to decode column {}: {}", index, source),
                None,
            ),
            sqlx::Error::Decode(source) => {
                DbError::database(format!("Decode error: {}", source), None)
            }
            other => DbError::database(other.to_string(), None),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors raised while reading the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
