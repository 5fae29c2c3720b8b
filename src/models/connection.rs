//! Connection-related data models.
//!
//! This module defines connection profiles, the ordered registry that holds
//! them, and the immutable server configuration shared by the router and
//! the query executor.

use crate::config::{
    DEFAULT_CONNECTION_NAME, DEFAULT_LOG_LEVEL, DEFAULT_PORT, DEFAULT_QUERY_TIMEOUT_SECS,
};
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// TCP port of a connection profile.
///
/// Settings files may carry the port as a number or as a string. Numeric
/// strings are normalized to numbers on load; anything else is kept verbatim
/// so the failure surfaces as a configuration error when the profile is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Port {
    Number(i64),
    Text(String),
}

impl Port {
    /// Parse a port from its textual form (environment variables, settings strings).
    pub fn parse(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map(Port::Number)
            .unwrap_or_else(|_| Port::Text(raw.to_string()))
    }

    pub fn normalize(self) -> Self {
        match self {
            Port::Text(raw) => Port::parse(&raw),
            number => number,
        }
    }

    /// Resolve to a usable TCP port.
    pub fn resolve(&self) -> DbResult<u16> {
        match self {
            Port::Number(n) => u16::try_from(*n)
                .map_err(|_| DbError::configuration(format!("port {} is out of range", n))),
            Port::Text(raw) => Err(DbError::configuration(format!(
                "invalid port '{}': not a number",
                raw
            ))),
        }
    }
}

impl Default for Port {
    fn default() -> Self {
        Port::Number(DEFAULT_PORT as i64)
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Port::Number(n) => write!(f, "{}", n),
            Port::Text(raw) => write!(f, "{}", raw),
        }
    }
}

impl From<u16> for Port {
    fn from(port: u16) -> Self {
        Port::Number(port as i64)
    }
}

/// A named set of credentials identifying one PostgreSQL target.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub name: String,
    pub host: String,
    pub port: Port,
    /// Empty means "let the driver pick its default" (PGUSER, OS user).
    pub user: String,
    /// Contains sensitive data - never log
    pub password: String,
    pub database: String,
}

impl ConnectionProfile {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: Port::from(port),
            user: user.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    /// Display-safe `user@host:port/database` form for logs.
    pub fn display_target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl std::fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("database", &self.database)
            .finish()
    }
}

/// Connection information returned by list_connections (password omitted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub name: String,
    pub host: String,
    pub port: Port,
    pub database: String,
    pub user: String,
}

impl From<&ConnectionProfile> for ConnectionSummary {
    fn from(profile: &ConnectionProfile) -> Self {
        Self {
            name: profile.name.clone(),
            host: profile.host.clone(),
            port: profile.port.clone(),
            database: profile.database.clone(),
            user: profile.user.clone(),
        }
    }
}

/// Connection profiles keyed by name, in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionRegistry {
    profiles: Vec<ConnectionProfile>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile. A profile with the same name is replaced in place,
    /// keeping its original position.
    pub fn insert(&mut self, profile: ConnectionProfile) {
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Summaries for every profile, in registry order.
    pub fn summaries(&self) -> Vec<ConnectionSummary> {
        self.profiles.iter().map(ConnectionSummary::from).collect()
    }
}

impl FromIterator<ConnectionProfile> for ConnectionRegistry {
    fn from_iter<I: IntoIterator<Item = ConnectionProfile>>(iter: I) -> Self {
        let mut registry = Self::new();
        for profile in iter {
            registry.insert(profile);
        }
        registry
    }
}

/// Immutable configuration shared by the router and the executor.
///
/// `default_connection` is not required to exist in `connections`; a tool call
/// resolving to a missing name fails with a configuration error instead of
/// falling back to another profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub connections: ConnectionRegistry,
    pub default_connection: String,
    /// Bound on session establishment. 0 waits indefinitely.
    pub query_timeout_secs: u64,
    pub log_level: String,
    pub enable_ssl: bool,
}

impl ServerConfig {
    pub fn new(connections: ConnectionRegistry) -> Self {
        Self {
            connections,
            ..Self::default()
        }
    }

    pub fn with_default_connection(mut self, name: impl Into<String>) -> Self {
        self.default_connection = name.into();
        self
    }

    pub fn with_query_timeout(mut self, secs: u64) -> Self {
        self.query_timeout_secs = secs;
        self
    }

    /// Connect timeout as a Duration, `None` when disabled.
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.query_timeout_secs > 0).then(|| Duration::from_secs(self.query_timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            default_connection: DEFAULT_CONNECTION_NAME.to_string(),
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            enable_ssl: false,
        }
    }
}
