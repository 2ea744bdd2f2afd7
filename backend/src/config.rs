//! Configuration management for the inventory ledger
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with INV__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Stock ledger behavior
    pub ledger: LedgerConfig,

    /// Notification outbox
    pub notifications: NotificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,

    /// Per-statement timeout applied to every connection
    pub statement_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for verifying JWT tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Retries for a ledger transaction that hits a serialization conflict
    pub max_tx_retries: u32,

    /// Page size for item, lot and movement lists
    pub default_page_size: u32,

    /// Page size for stock request lists
    pub request_page_size: u32,

    /// Largest page a caller may ask for
    pub max_page_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Whether ledger events are delivered at all
    pub enabled: bool,

    /// User roles that receive new-request and low-stock notices
    pub manager_roles: Vec<String>,

    /// Capacity of the outbound event queue
    pub queue_capacity: usize,

    /// Optional push gateway that mirrors in-app notifications
    pub push_gateway_url: Option<String>,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("INV_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8080)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.statement_timeout_ms", 15000)?
            .set_default("ledger.max_tx_retries", 3)?
            .set_default("ledger.default_page_size", 100)?
            .set_default("ledger.request_page_size", 50)?
            .set_default("ledger.max_page_size", 100)?
            .set_default("notifications.enabled", true)?
            .set_default("notifications.manager_roles", vec!["Level 1", "Level 2", "warehouse"])?
            .set_default("notifications.queue_capacity", 1024)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (INV__ prefix)
            .add_source(
                Environment::with_prefix("INV")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("notifications.manager_roles")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig {
                port: 8080,
                host: "0.0.0.0".to_string(),
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
                min_connections: 2,
                acquire_timeout_secs: 30,
                statement_timeout_ms: 15000,
            },
            jwt: JwtConfig {
                secret: "development-secret-key".to_string(),
            },
            ledger: LedgerConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_tx_retries: 3,
            default_page_size: 100,
            request_page_size: 50,
            max_page_size: 100,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            manager_roles: vec![
                "Level 1".to_string(),
                "Level 2".to_string(),
                "warehouse".to_string(),
            ],
            queue_capacity: 1024,
            push_gateway_url: None,
        }
    }
}
