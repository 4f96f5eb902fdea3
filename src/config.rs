//! Configuration handling for the trade store.
//!
//! This module provides configuration management via CLI arguments and environment variables.
//! The database is reached over TCP when `DB_TCP_HOST` is set, otherwise through the
//! unix socket Cloud SQL exposes under `DB_SOCKET_DIR`.

use crate::error::{StoreError, StoreResult};
use crate::models::ExchangeConfig;
use clap::{Parser, Subcommand};
use sqlx::mysql::MySqlConnectOptions;
use std::path::PathBuf;

pub const DEFAULT_SOCKET_DIR: &str = "/cloudsql";
pub const DEFAULT_PROCEDURE_SCHEMA: &str = "cryptopump";
pub const DEFAULT_LOCK_DIR: &str = ".";
pub const DEFAULT_EXCHANGE_NAME: &str = "binance";

/// How the pool reaches the database server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Tcp { host: String, port: u16 },
    /// Unix socket at `<socket_dir>/<instance>`
    Socket { socket_dir: String, instance: String },
}

impl Transport {
    /// Socket path with the directory normalized to a single leading slash.
    pub fn socket_path(&self) -> Option<String> {
        match self {
            Self::Tcp { .. } => None,
            Self::Socket {
                socket_dir,
                instance,
            } => {
                let dir = socket_dir.trim_matches('/');
                if dir.is_empty() {
                    Some(format!("/{}", instance))
                } else {
                    Some(format!("/{}/{}", dir, instance))
                }
            }
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(f, "tcp({}:{})", host, port),
            Self::Socket { .. } => {
                write!(f, "unix({})", self.socket_path().unwrap_or_default())
            }
        }
    }
}

/// Validated database connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub transport: Transport,
    pub user: String,
    /// Sensitive - never log
    pub password: String,
    pub database: String,
    /// Schema that qualifies every procedure call.
    pub procedure_schema: String,
}

impl DatabaseSettings {
    /// Data source name in the `user:pass@transport/dbname?parseTime=true` form.
    pub fn dsn(&self) -> String {
        format!(
            "{}:{}@{}/{}?parseTime=true",
            self.user, self.password, self.transport, self.database
        )
    }

    /// Same as [`dsn`](Self::dsn) with the password masked, safe to log.
    pub fn redacted_dsn(&self) -> String {
        format!(
            "{}:***@{}/{}?parseTime=true",
            self.user, self.transport, self.database
        )
    }

    /// Driver connect options for these settings.
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .charset("utf8mb4");

        match &self.transport {
            Transport::Tcp { host, port } => options.host(host).port(*port),
            Transport::Socket { .. } => match self.transport.socket_path() {
                Some(path) => options.socket(path),
                None => options,
            },
        }
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("transport", &self.transport)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("procedure_schema", &self.procedure_schema)
            .finish()
    }
}

/// Diagnostic commands of the binary.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show the flagged session, running thread count and committed amount
    Status,
    /// Find an abandoned thread whose lock file is gone
    Adopt,
    /// Show the global profit summary
    Profit,
    /// Show the transactions and profit of one thread
    Thread {
        /// Thread identifier
        thread_id: String,
    },
}

/// Configuration for the trade store.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "trade-store",
    about = "Stored-procedure persistence layer for trading-bot sessions and orders",
    version,
    author
)]
pub struct Config {
    /// TCP host of the database. When unset, a unix socket connection is used.
    #[arg(long, env = "DB_TCP_HOST")]
    pub db_tcp_host: Option<String>,

    /// TCP port of the database (required with DB_TCP_HOST)
    #[arg(long, env = "DB_PORT")]
    pub db_port: Option<String>,

    /// Database user
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long, env = "DB_PASS", hide_env_values = true)]
    pub db_pass: Option<String>,

    /// Database name
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Cloud SQL instance connection name (required without DB_TCP_HOST)
    #[arg(long, env = "INSTANCE_CONNECTION_NAME")]
    pub instance_connection_name: Option<String>,

    /// Directory holding the instance socket
    #[arg(long, default_value = DEFAULT_SOCKET_DIR, env = "DB_SOCKET_DIR")]
    pub db_socket_dir: String,

    /// Schema qualifying every stored procedure call
    #[arg(long, default_value = DEFAULT_PROCEDURE_SCHEMA, env = "DB_SCHEMA")]
    pub db_schema: String,

    /// Directory probed for `<thread_id>.lock` files
    #[arg(long, default_value = DEFAULT_LOCK_DIR, env = "LOCK_DIR")]
    pub lock_dir: PathBuf,

    /// Exchange name recorded with sessions
    #[arg(long, default_value = DEFAULT_EXCHANGE_NAME, env = "EXCHANGE_NAME")]
    pub exchange_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            db_tcp_host: None,
            db_port: None,
            db_user: None,
            db_pass: None,
            db_name: None,
            instance_connection_name: None,
            db_socket_dir: DEFAULT_SOCKET_DIR.to_string(),
            db_schema: DEFAULT_PROCEDURE_SCHEMA.to_string(),
            lock_dir: PathBuf::from(DEFAULT_LOCK_DIR),
            exchange_name: DEFAULT_EXCHANGE_NAME.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            command: None,
        }
    }

    /// Deployment parameters recorded with every session row.
    pub fn exchange_config(&self) -> ExchangeConfig {
        ExchangeConfig::new(self.exchange_name.clone())
    }

    /// Validate the database settings.
    ///
    /// Fails on the first required variable that is unset or empty, before anything
    /// touches the network.
    pub fn database_settings(&self) -> StoreResult<DatabaseSettings> {
        let transport = match present(&self.db_tcp_host) {
            Some(host) => {
                let port = required(&self.db_port, "DB_PORT")?;
                let port = port.parse::<u16>().map_err(|e| {
                    StoreError::configuration("DB_PORT", format!("is not a valid port: {e}"))
                })?;
                Transport::Tcp {
                    host: host.to_string(),
                    port,
                }
            }
            None => Transport::Socket {
                socket_dir: self.db_socket_dir.clone(),
                instance: required(&self.instance_connection_name, "INSTANCE_CONNECTION_NAME")?
                    .to_string(),
            },
        };

        let user = required(&self.db_user, "DB_USER")?.to_string();
        let password = required(&self.db_pass, "DB_PASS")?.to_string();
        let database = required(&self.db_name, "DB_NAME")?.to_string();
        validate_schema(&self.db_schema)?;

        Ok(DatabaseSettings {
            transport,
            user,
            password,
            database,
            procedure_schema: self.db_schema.clone(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, variable: &str) -> StoreResult<&'a str> {
    present(value).ok_or_else(|| StoreError::missing(variable))
}

/// Schema names are spliced into `CALL` statements, so only identifier characters pass.
pub fn validate_schema(schema: &str) -> StoreResult<()> {
    if schema.is_empty() {
        return Err(StoreError::missing("DB_SCHEMA"));
    }
    if !schema
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(StoreError::configuration(
            "DB_SCHEMA",
            format!("'{}' may only contain letters, digits and '_'", schema),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_config() -> Config {
        Config {
            db_tcp_host: Some("127.0.0.1".to_string()),
            db_port: Some("3306".to_string()),
            db_user: Some("bot".to_string()),
            db_pass: Some("secret".to_string()),
            db_name: Some("cryptopump".to_string()),
            ..Config::default()
        }
    }

    fn socket_config() -> Config {
        Config {
            db_user: Some("bot".to_string()),
            db_pass: Some("secret".to_string()),
            db_name: Some("cryptopump".to_string()),
            instance_connection_name: Some("project:region:instance".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.db_socket_dir, DEFAULT_SOCKET_DIR);
        assert_eq!(config.db_schema, DEFAULT_PROCEDURE_SCHEMA);
        assert!(config.command.is_none());
    }

    #[test]
    fn test_tcp_host_selects_tcp_transport() {
        let settings = tcp_config().database_settings().unwrap();
        assert_eq!(
            settings.transport,
            Transport::Tcp {
                host: "127.0.0.1".to_string(),
                port: 3306
            }
        );
        assert_eq!(
            settings.dsn(),
            "bot:secret@tcp(127.0.0.1:3306)/cryptopump?parseTime=true"
        );
    }

    #[test]
    fn test_no_tcp_host_selects_socket_transport() {
        let settings = socket_config().database_settings().unwrap();
        assert_eq!(
            settings.transport.socket_path().as_deref(),
            Some("/cloudsql/project:region:instance")
        );
        assert_eq!(
            settings.dsn(),
            "bot:secret@unix(/cloudsql/project:region:instance)/cryptopump?parseTime=true"
        );
    }

    #[test]
    fn test_empty_tcp_host_falls_back_to_socket() {
        let config = Config {
            db_tcp_host: Some(String::new()),
            ..socket_config()
        };
        let settings = config.database_settings().unwrap();
        assert!(matches!(settings.transport, Transport::Socket { .. }));
    }

    #[test]
    fn test_custom_socket_dir() {
        let config = Config {
            db_socket_dir: "var/run/sql/".to_string(),
            ..socket_config()
        };
        let settings = config.database_settings().unwrap();
        assert_eq!(
            settings.transport.socket_path().as_deref(),
            Some("/var/run/sql/project:region:instance")
        );
    }

    #[test]
    fn test_missing_required_values() {
        let cases: Vec<(Config, &str)> = vec![
            (
                Config {
                    db_port: None,
                    ..tcp_config()
                },
                "DB_PORT",
            ),
            (
                Config {
                    db_user: None,
                    ..tcp_config()
                },
                "DB_USER",
            ),
            (
                Config {
                    db_pass: Some(String::new()),
                    ..tcp_config()
                },
                "DB_PASS",
            ),
            (
                Config {
                    db_name: None,
                    ..socket_config()
                },
                "DB_NAME",
            ),
            (
                Config {
                    instance_connection_name: None,
                    ..socket_config()
                },
                "INSTANCE_CONNECTION_NAME",
            ),
        ];

        for (config, expected) in cases {
            match config.database_settings() {
                Err(StoreError::Configuration { variable, .. }) => {
                    assert_eq!(variable, expected)
                }
                other => panic!("expected configuration error for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_port_rejected() {
        let config = Config {
            db_port: Some("mysql".to_string()),
            ..tcp_config()
        };
        let err = config.database_settings().unwrap_err();
        assert!(err.to_string().contains("DB_PORT"));
    }

    #[test]
    fn test_schema_validation() {
        assert!(validate_schema("cryptopump_test").is_ok());
        assert!(validate_schema("").is_err());
        assert!(validate_schema("pump; DROP TABLE x").is_err());

        let config = Config {
            db_schema: "bad.schema".to_string(),
            ..tcp_config()
        };
        assert!(config.database_settings().is_err());
    }

    #[test]
    fn test_debug_and_redacted_dsn_hide_password() {
        let settings = tcp_config().database_settings().unwrap();
        assert!(!format!("{:?}", settings).contains("secret"));
        assert_eq!(
            settings.redacted_dsn(),
            "bot:***@tcp(127.0.0.1:3306)/cryptopump?parseTime=true"
        );
    }

    #[test]
    fn test_exchange_config_from_flag() {
        assert_eq!(Config::default_config().exchange_config().exchange_name, "binance");

        let config =
            Config::try_parse_from(["trade-store", "--exchange-name", "binance.us"]).unwrap();
        assert_eq!(config.exchange_config(), ExchangeConfig::new("binance.us"));
    }

    #[test]
    fn test_parse_subcommand() {
        let config = Config::try_parse_from(["trade-store", "thread", "t-1"]).unwrap();
        assert_eq!(
            config.command,
            Some(Command::Thread {
                thread_id: "t-1".to_string()
            })
        );
    }
}
