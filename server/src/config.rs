//! Configuration management for the ticket history service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Empty variables count as unset. Call `dotenvy::dotenv()` first to pick up
//! a local `.env` file.
//!
//! # Example
//!
//! ```no_run
//! use ticket_history_server::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! println!("HTTP on {}", config.server.http_addr());
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use ticket_history_postgres::PoolSettings;
use ticket_history_runtime::SnapshotPolicy;

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },

    /// Unknown `APP_ENV`
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Automated tests
    Test,
    /// Pre-production
    Staging,
    /// Production
    Production,
}

impl Environment {
    /// Check if this is production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" | "local" => Ok(Self::Development),
            "test" | "testing" => Ok(Self::Test),
            "staging" | "stage" => Ok(Self::Staging),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Test => write!(f, "test"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    /// Interface both listeners bind to
    pub host: String,
    /// REST port
    pub http_port: u16,
    /// gRPC port
    pub grpc_port: u16,
    /// Grace period for in-flight work on shutdown, in seconds
    pub shutdown_timeout: u64,
}

impl ServerConfig {
    /// `host:port` of the REST listener.
    #[must_use]
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }

    /// `host:port` of the gRPC listener.
    #[must_use]
    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.host, self.grpc_port)
    }

    /// Shutdown grace period as a [`Duration`].
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

/// `PostgreSQL` configuration
///
/// When `DATABASE_URL` is set it wins; otherwise the URL is composed from the
/// individual `DB_*` parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseConfig {
    /// Explicit connection URL (may contain a password, never serialized)
    #[serde(skip_serializing)]
    pub url: Option<String>,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Login role
    pub user: String,
    /// Login password (never serialized)
    #[serde(skip_serializing)]
    pub password: String,
    /// Database name
    pub database: String,
    /// `sslmode` query parameter
    pub ssl_mode: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Statement timeout in seconds
    pub statement_timeout: u64,
    /// Idle timeout in seconds
    pub idle_timeout: u64,
}

impl DatabaseConfig {
    /// Connection URL, explicit or composed from parts.
    #[must_use]
    pub fn url(&self) -> String {
        self.url.clone().unwrap_or_else(|| {
            format!(
                "postgres://{}:{}@{}:{}/{}?sslmode={}",
                urlencoding::encode(&self.user),
                urlencoding::encode(&self.password),
                self.host,
                self.port,
                self.database,
                self.ssl_mode
            )
        })
    }

    /// Pool sizing and timeouts for the storage adapter.
    #[must_use]
    pub const fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout: Duration::from_secs(self.connect_timeout),
            statement_timeout: Duration::from_secs(self.statement_timeout),
            idle_timeout: Duration::from_secs(self.idle_timeout),
        }
    }
}

/// Kafka producer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KafkaConfig {
    /// Broker addresses, blanks dropped
    pub brokers: Vec<String>,
    /// Topic for ticket events, empty when unset
    pub topic: String,
    /// Producer `acks`
    pub acks: String,
    /// Producer `compression.type`
    pub compression: String,
}

impl KafkaConfig {
    /// Whether enough is configured to publish.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.brokers.is_empty() && !self.topic.is_empty()
    }
}

/// Search service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchConfig {
    /// Base URL of the search service
    pub url: Option<String>,
}

/// Change notification configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationConfig {
    /// Re-read the ticket after an update and notify with that snapshot
    pub refetch: bool,
}

impl NotificationConfig {
    /// Snapshot policy for the ticket service.
    #[must_use]
    pub const fn snapshot_policy(self) -> SnapshotPolicy {
        if self.refetch {
            SnapshotPolicy::Refetch
        } else {
            SnapshotPolicy::Persisted
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// `APP_ENV`
    pub environment: Environment,
    /// Listener configuration
    pub server: ServerConfig,
    /// `PostgreSQL` configuration
    pub database: DatabaseConfig,
    /// Kafka configuration
    pub kafka: KafkaConfig,
    /// Search service configuration
    pub search: SearchConfig,
    /// Change notification configuration
    pub notifications: NotificationConfig,
}

impl Config {
    /// Load and validate configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable cannot be parsed or validation
    /// fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load and validate configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable cannot be parsed or validation
    /// fails.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let config = Self {
            environment: vars
                .get("APP_ENV")
                .map_or(Ok(Environment::default()), |raw| raw.parse())?,
            server: ServerConfig {
                host: vars.string("APP_HOST", "0.0.0.0"),
                http_port: vars.first_parsed(&["APP_PORT", "HTTP_PORT"], 8097)?,
                grpc_port: vars.parsed("GRPC_PORT", 9097)?,
                shutdown_timeout: vars.parsed("SHUTDOWN_TIMEOUT", 10)?,
            },
            database: DatabaseConfig {
                url: vars.get("DATABASE_URL"),
                host: vars.string("DB_HOST", "localhost"),
                port: vars.parsed("DB_PORT", 5432)?,
                user: vars.string("DB_USER", "postgres"),
                password: vars.string("DB_PASSWORD", "postgres"),
                database: vars.string("DB_DATABASE", "ticket_service"),
                ssl_mode: vars.string("DB_SSLMODE", "disable"),
                max_connections: vars.parsed("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: vars.parsed("DATABASE_MIN_CONNECTIONS", 1)?,
                connect_timeout: vars.parsed("DATABASE_CONNECT_TIMEOUT", 30)?,
                statement_timeout: vars.parsed("DATABASE_STATEMENT_TIMEOUT", 30)?,
                idle_timeout: vars.parsed("DATABASE_IDLE_TIMEOUT", 600)?,
            },
            kafka: KafkaConfig {
                brokers: ticket_history_redpanda::parse_brokers(
                    &vars.get("KAFKA_BROKERS").unwrap_or_default(),
                ),
                topic: vars.string("KAFKA_TOPIC_TICKET", ""),
                acks: vars.string("KAFKA_ACKS", "1"),
                compression: vars.string("KAFKA_COMPRESSION", "none"),
            },
            search: SearchConfig {
                url: vars.get("SEARCH_SERVICE_URL"),
            },
            notifications: NotificationConfig {
                refetch: vars.flag("NOTIFY_REFETCH", true)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the database cannot be located,
    /// a production deployment has no database password, or the pool sizing
    /// is inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.database;
        if db.url.is_none() && (db.host.is_empty() || db.database.is_empty()) {
            return Err(ConfigError::Validation(
                "DB_HOST and DB_DATABASE are required".to_string(),
            ));
        }
        if self.environment.is_production() && db.url.is_none() && db.password.is_empty() {
            return Err(ConfigError::Validation(
                "in production DB_PASSWORD is required".to_string(),
            ));
        }
        if db.max_connections == 0 {
            return Err(ConfigError::Validation(
                "DATABASE_MAX_CONNECTIONS must be > 0".to_string(),
            ));
        }
        if db.min_connections > db.max_connections {
            return Err(ConfigError::Validation(
                "DATABASE_MIN_CONNECTIONS cannot exceed DATABASE_MAX_CONNECTIONS".to_string(),
            ));
        }
        Ok(())
    }
}

/// Variable source that treats empty values as unset.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
            None => Ok(default),
        }
    }

    fn first_parsed<T: FromStr>(&self, keys: &[&'static str], default: T) -> Result<T, ConfigError> {
        for &key in keys {
            if self.get(key).is_some() {
                return self.parsed(key, default);
            }
        }
        Ok(default)
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key).map(|v| v.to_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(value) => Err(ConfigError::InvalidValue { key, value }),
        }
    }
}
