pub mod loader;

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub use loader::{ConfigError, ConfigLoader, LoaderOptions};

pub const APP_ENV: &str = "APP_ENV";
pub const ENV_DEV: &str = "dev";

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: App,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct App {
    pub env: String,
    pub service_name: String,
    pub hostname: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreChoice {
    Sql,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub choice: StoreChoice,
    pub sql: DbConnectionConfig,
}

/// PostgreSQL connection and pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConnectionConfig {
    pub dialect: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub ssl_mode: String,
    pub name: String,
    /// Optional `search_path`.
    pub schema: Option<String>,
    pub max_open_connections: u32,
    pub max_idle_connections: u32,
    pub connection_lifetime_secs: u64,
    pub connection_max_idle_time_secs: u64,
    pub connect_timeout_secs: u64,
    /// Log every statement when true.
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for App {
    fn default() -> Self {
        Self {
            env: ENV_DEV.to_string(),
            service_name: "image-analyzer".to_string(),
            hostname: "http://localhost:8081".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            choice: StoreChoice::Sql,
            sql: DbConnectionConfig::default(),
        }
    }
}

impl Default for DbConnectionConfig {
    fn default() -> Self {
        Self {
            dialect: "postgres".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: String::new(),
            ssl_mode: "disable".to_string(),
            name: "image_analyzer".to_string(),
            schema: None,
            max_open_connections: 10,
            max_idle_connections: 2,
            connection_lifetime_secs: 30 * 60,
            connection_max_idle_time_secs: 5 * 60,
            connect_timeout_secs: 10,
            debug: false,
        }
    }
}

impl DbConnectionConfig {
    pub fn connection_lifetime(&self) -> Duration {
        Duration::from_secs(self.connection_lifetime_secs)
    }

    pub fn connection_max_idle_time(&self) -> Duration {
        Duration::from_secs(self.connection_max_idle_time_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8081".to_string(),
            shutdown_timeout_secs: 20,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Environment the process runs in, from `APP_ENV` (defaults to `dev`).
pub fn app_env() -> String {
    match env::var(APP_ENV) {
        Ok(v) if !v.is_empty() => v,
        _ => ENV_DEV.to_string(),
    }
}

impl AppConfig {
    /// Load `default.toml` + `<APP_ENV>.toml`, then apply env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let env_name = app_env();
        let mut config: AppConfig = ConfigLoader::from_env().load(&env_name)?;
        config.app.env = env_name;
        Ok(config.with_env_overrides())
    }

    pub fn is_development(&self) -> bool {
        self.app.env == ENV_DEV
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DB_HOST") {
            self.store.sql.host = v;
        }
        if let Ok(v) = env::var("DB_PORT") {
            self.store.sql.port = v.parse().unwrap_or(self.store.sql.port);
        }
        if let Ok(v) = env::var("DB_NAME") {
            self.store.sql.name = v;
        }
        if let Ok(v) = env::var("DB_USER") {
            self.store.sql.username = v;
        }
        if let Ok(v) = env::var("DB_PASSWORD") {
            self.store.sql.password = v;
        }
        if let Ok(v) = env::var("DB_SSL_MODE") {
            self.store.sql.ssl_mode = v;
        }
        if let Ok(v) = env::var("DB_MAX_OPEN_CONNECTIONS") {
            self.store.sql.max_open_connections = v.parse().unwrap_or(self.store.sql.max_open_connections);
        }
        if let Ok(v) = env::var("DB_DEBUG") {
            self.store.sql.debug = v.parse().unwrap_or(self.store.sql.debug);
        }

        // Server overrides
        if let Ok(v) = env::var("SERVER_ADDRESS") {
            self.server.address = v;
        }
        if let Ok(v) = env::var("SERVER_SHUTDOWN_TIMEOUT_SECS") {
            self.server.shutdown_timeout_secs = v.parse().unwrap_or(self.server.shutdown_timeout_secs);
        }

        // Logging overrides
        if let Ok(v) = env::var("LOG_LEVEL") {
            self.log.level = v;
        }

        self
    }
}
