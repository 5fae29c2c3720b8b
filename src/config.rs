//! Configuration handling for the PostgreSQL MCP Server.
//!
//! Process-level options (settings path, logging) come from CLI arguments and
//! environment variables via `clap`. Connection profiles are layered:
//! built-in defaults, then the `postgres` object of the settings file, then
//! `CONNECTION_NAMES`-driven environment variables, then a synthesized
//! `default` profile when nothing was configured.

use crate::error::ConfigError;
use crate::models::{ConnectionProfile, ConnectionRegistry, Port, ServerConfig};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_CONNECTION_NAME: &str = "default";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;

// Fallback profile used when no connection is configured at all
pub const FALLBACK_USER: &str = "learning_user";
pub const FALLBACK_PASSWORD: &str = "django123";
pub const FALLBACK_DATABASE: &str = "learning_db";

/// Environment variable listing the connection names to read from the environment.
pub const CONNECTION_NAMES_VAR: &str = "CONNECTION_NAMES";

/// Environment variable bound to `--settings`.
pub const SETTINGS_ENV_VAR: &str = "PG_MCP_SETTINGS";

/// Configuration for the PostgreSQL MCP Server process.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pg-mcp-server",
    about = "MCP server for PostgreSQL - lets AI assistants run SQL against named connections",
    version,
    author
)]
pub struct Config {
    /// Path to the JSON settings file (its "postgres" object is read)
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = DEFAULT_SETTINGS_FILE,
        env = SETTINGS_ENV_VAR
    )]
    pub settings: PathBuf,

    /// Log level (trace, debug, info, warn, error). Overrides the settings file.
    #[arg(long, env = "PG_MCP_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long, env = "PG_MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output on stderr (disabled by default to keep stdio quiet)
    #[arg(long, env = "PG_MCP_ENABLE_LOGS")]
    pub enable_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            settings: PathBuf::from(DEFAULT_SETTINGS_FILE),
            log_level: None,
            json_logs: false,
            enable_logs: false,
        }
    }

    /// Effective log level: CLI/env first, then the settings file.
    pub fn effective_log_level<'a>(&'a self, server: &'a ServerConfig) -> &'a str {
        self.log_level.as_deref().unwrap_or(server.log_level.as_str())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Shape of the settings file.
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    postgres: PostgresSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostgresSettings {
    query_timeout: Option<u64>,
    log_level: Option<String>,
    default_connection: Option<String>,
    #[serde(rename = "enableSSL")]
    enable_ssl: Option<bool>,
    #[serde(default)]
    connections: Vec<ConnectionEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ConnectionEntry {
    name: Option<String>,
    host: Option<String>,
    port: Option<Port>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

impl ConnectionEntry {
    fn into_profile(self) -> ConnectionProfile {
        ConnectionProfile {
            name: self
                .name
                .unwrap_or_else(|| DEFAULT_CONNECTION_NAME.to_string()),
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.map(Port::normalize).unwrap_or_default(),
            user: self.user.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            database: self.database.unwrap_or_default(),
        }
    }
}

/// Result of loading configuration; warnings are non-fatal.
#[derive(Debug)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub warnings: Vec<ConfigError>,
}

/// Builds a [`ServerConfig`] from the settings file and the environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    settings_path: PathBuf,
}

impl ConfigLoader {
    pub fn new(settings_path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
        }
    }

    /// Load configuration using the process environment.
    pub fn load(&self) -> LoadedConfig {
        self.load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration with an injectable environment lookup.
    pub fn load_with<F>(&self, env: F) -> LoadedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut server = ServerConfig::default();
        let mut warnings = Vec::new();

        match self.read_settings() {
            Ok(Some(settings)) => apply_settings(&mut server, settings.postgres),
            Ok(None) => {}
            Err(e) => warnings.push(e),
        }

        apply_environment(&mut server.connections, &env);
        ensure_default_connection(&mut server.connections, &env);

        LoadedConfig { server, warnings }
    }

    /// Read the settings file. A missing file is not an error.
    fn read_settings(&self) -> Result<Option<SettingsFile>, ConfigError> {
        if !self.settings_path.exists() {
            return Ok(None);
        }
        let path = self.settings_path.display().to_string();
        let content = std::fs::read_to_string(&self.settings_path).map_err(|source| {
            ConfigError::Io {
                path: path.clone(),
                source,
            }
        })?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse { path, source })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_FILE)
    }
}

/// Apply the file layer. Scalars absent from the file fall back to defaults.
fn apply_settings(server: &mut ServerConfig, settings: PostgresSettings) {
    server.query_timeout_secs = settings
        .query_timeout
        .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS);
    server.log_level = settings
        .log_level
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    server.default_connection = settings
        .default_connection
        .unwrap_or_else(|| DEFAULT_CONNECTION_NAME.to_string());
    server.enable_ssl = settings.enable_ssl.unwrap_or(false);

    for entry in settings.connections {
        server.connections.insert(entry.into_profile());
    }
}

/// Register every connection named in `CONNECTION_NAMES` whose host, user,
/// password and database variables are all set and non-empty.
fn apply_environment<F>(connections: &mut ConnectionRegistry, env: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let names = env(CONNECTION_NAMES_VAR).unwrap_or_else(|| DEFAULT_CONNECTION_NAME.to_string());
    for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if let Some(profile) = profile_from_env(name, env) {
            connections.insert(profile);
        }
    }
}

fn profile_from_env<F>(name: &str, env: &F) -> Option<ConnectionProfile>
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = name.to_uppercase();
    let var = |suffix: &str| env(&format!("{}_{}", prefix, suffix)).filter(|v| !v.is_empty());

    let host = var("HOST")?;
    let user = var("USER")?;
    let password = var("PASSWORD")?;
    let database = var("DATABASE")?;
    let port = var("PORT")
        .map(|p| Port::parse(&p))
        .unwrap_or_default();

    Some(ConnectionProfile {
        name: name.to_string(),
        host,
        port,
        user,
        password,
        database,
    })
}

fn ensure_default_connection<F>(connections: &mut ConnectionRegistry, env: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if !connections.is_empty() {
        return;
    }
    let var = |key: &str, fallback: &str| env(key).unwrap_or_else(|| fallback.to_string());
    connections.insert(ConnectionProfile {
        name: DEFAULT_CONNECTION_NAME.to_string(),
        host: var("DEFAULT_HOST", DEFAULT_HOST),
        port: Port::parse(&var("DEFAULT_PORT", DEFAULT_PORT.to_string().as_str())),
        user: var("DEFAULT_USER", FALLBACK_USER),
        password: var("DEFAULT_PASSWORD", FALLBACK_PASSWORD),
        database: var("DEFAULT_DATABASE", FALLBACK_DATABASE),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn missing_file_loader() -> ConfigLoader {
        ConfigLoader::new("/nonexistent/pg-mcp-server/settings.json")
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.settings, PathBuf::from(DEFAULT_SETTINGS_FILE));
        assert!(config.log_level.is_none());
        assert!(!config.enable_logs);
    }

    #[test]
    fn test_settings_flag_bound_to_env_var() {
        use clap::CommandFactory;

        let command = Config::command();
        let settings = command
            .get_arguments()
            .find(|arg| arg.get_id() == "settings")
            .unwrap();
        assert_eq!(
            settings.get_env(),
            Some(std::ffi::OsStr::new(SETTINGS_ENV_VAR))
        );
        assert_eq!(SETTINGS_ENV_VAR, "PG_MCP_SETTINGS");
    }

    #[test]
    fn test_parse_settings_flag() {
        let config = Config::try_parse_from([
            "pg-mcp-server",
            "--settings",
            "/etc/pg-mcp.json",
            "--enable-logs",
        ])
        .unwrap();
        assert_eq!(config.settings, PathBuf::from("/etc/pg-mcp.json"));
        assert!(config.enable_logs);
    }

    #[test]
    fn test_effective_log_level_prefers_cli() {
        let server = ServerConfig {
            log_level: "warn".to_string(),
            ..ServerConfig::default()
        };
        let config = Config::default();
        assert_eq!(config.effective_log_level(&server), "warn");

        let config = Config {
            log_level: Some("debug".to_string()),
            ..Config::default()
        };
        assert_eq!(config.effective_log_level(&server), "debug");
    }

    #[test]
    fn test_fallback_default_connection() {
        let loaded = missing_file_loader().load_with(env_from(&[]));
        assert!(loaded.warnings.is_empty());

        let server = loaded.server;
        assert_eq!(server.connections.len(), 1);
        let default = server.connections.get("default").unwrap();
        assert_eq!(default.host, "localhost");
        assert_eq!(default.port, Port::Number(5432));
        assert_eq!(default.user, FALLBACK_USER);
        assert_eq!(default.password, FALLBACK_PASSWORD);
        assert_eq!(default.database, FALLBACK_DATABASE);
        assert_eq!(server.default_connection, "default");
        assert_eq!(server.query_timeout_secs, 30);
    }

    #[test]
    fn test_fallback_reads_default_env_vars() {
        let env = env_from(&[("DEFAULT_HOST", "db.internal"), ("DEFAULT_PORT", "6432")]);
        let server = missing_file_loader().load_with(env).server;
        let default = server.connections.get("default").unwrap();
        assert_eq!(default.host, "db.internal");
        assert_eq!(default.port, Port::Number(6432));
    }

    #[test]
    fn test_env_connection_requires_all_fields() {
        let env = env_from(&[
            ("CONNECTION_NAMES", "analytics"),
            ("ANALYTICS_HOST", "a.example"),
            ("ANALYTICS_USER", "reader"),
            ("ANALYTICS_DATABASE", "warehouse"),
        ]);
        let server = missing_file_loader().load_with(env).server;
        // Missing password: not registered, so only the fallback exists
        assert!(!server.connections.contains("analytics"));
        assert!(server.connections.contains("default"));
    }

    #[test]
    fn test_env_connections_in_listed_order() {
        let env = env_from(&[
            ("CONNECTION_NAMES", " staging , ,prod"),
            ("STAGING_HOST", "s"),
            ("STAGING_USER", "u"),
            ("STAGING_PASSWORD", "p"),
            ("STAGING_DATABASE", "d"),
            ("STAGING_PORT", "5433"),
            ("PROD_HOST", "p"),
            ("PROD_USER", "u"),
            ("PROD_PASSWORD", "p"),
            ("PROD_DATABASE", "d"),
        ]);
        let server = missing_file_loader().load_with(env).server;
        let names: Vec<_> = server.connections.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["staging", "prod"]);
        assert_eq!(
            server.connections.get("staging").unwrap().port,
            Port::Number(5433)
        );
        assert_eq!(
            server.connections.get("prod").unwrap().port,
            Port::Number(5432)
        );
    }

    #[test]
    fn test_empty_env_value_is_treated_as_unset() {
        let env = env_from(&[
            ("DEFAULT_HOST", "h"),
            ("DEFAULT_USER", ""),
            ("DEFAULT_PASSWORD", "p"),
            ("DEFAULT_DATABASE", "d"),
        ]);
        let server = missing_file_loader().load_with(env).server;
        // Env layer skipped, fallback still uses DEFAULT_HOST
        let default = server.connections.get("default").unwrap();
        assert_eq!(default.host, "h");
        assert_eq!(default.user, "");
    }

    #[test]
    fn test_entry_defaults() {
        let profile = ConnectionEntry::default().into_profile();
        assert_eq!(profile.name, "default");
        assert_eq!(profile.host, "localhost");
        assert_eq!(profile.port, Port::Number(5432));
        assert_eq!(profile.user, "");
    }

    #[test]
    fn test_settings_parse_camel_case_keys() {
        let json = r#"{
            "postgres": {
                "queryTimeout": 5,
                "logLevel": "debug",
                "defaultConnection": "main",
                "enableSSL": true,
                "connections": [
                    {"name": "main", "host": "db", "port": "5433", "user": "u", "password": "p", "database": "d"}
                ]
            }
        }"#;
        let settings: SettingsFile = serde_json::from_str(json).unwrap();
        let mut server = ServerConfig::default();
        apply_settings(&mut server, settings.postgres);

        assert_eq!(server.query_timeout_secs, 5);
        assert_eq!(server.log_level, "debug");
        assert_eq!(server.default_connection, "main");
        assert!(server.enable_ssl);
        assert_eq!(
            server.connections.get("main").unwrap().port,
            Port::Number(5433)
        );
    }
}
