use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{ConnectOptions, Connection, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::{DbConnectionConfig, StoreChoice, StoreConfig};

pub const DIALECT_POSTGRES: &str = "postgres";

/// Errors raised while opening the store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("unknown database choice: {0:?}")]
    UnsupportedStore(StoreChoice),

    #[error("dialect for the db is not defined: {0}")]
    UndefinedDialect(String),

    #[error("invalid ssl mode: {0}")]
    InvalidSslMode(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Pooled PostgreSQL handle, opened once at startup and cloned freely.
#[derive(Clone, Debug)]
pub struct Db {
    pool: PgPool,
    database_name: String,
}

impl Db {
    /// Open the pool described by `config`. Fails fast when the database is
    /// unreachable.
    pub async fn connect(config: &DbConnectionConfig) -> Result<Self, DatabaseError> {
        let options = Self::connect_options(config)?;
        let pool = Self::pool_options(config).connect_with(options).await?;

        info!(
            database = %config.name,
            host = %config.host,
            max_connections = config.max_open_connections,
            "connected to database"
        );

        Ok(Self {
            pool,
            database_name: config.name.clone(),
        })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool, database_name: impl Into<String>) -> Self {
        Self {
            pool,
            database_name: database_name.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Pings one pooled connection.
    pub async fn alive(&self) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!(database = %self.database_name, "closed database pool");
    }

    fn connect_options(config: &DbConnectionConfig) -> Result<PgConnectOptions, DatabaseError> {
        if config.dialect != DIALECT_POSTGRES {
            return Err(DatabaseError::UndefinedDialect(config.dialect.clone()));
        }

        let ssl_mode = PgSslMode::from_str(&config.ssl_mode)
            .map_err(|_| DatabaseError::InvalidSslMode(config.ssl_mode.clone()))?;

        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.username)
            .password(&config.password)
            .ssl_mode(ssl_mode);

        if let Some(schema) = config.schema.as_deref().filter(|s| !s.is_empty()) {
            options = options.options([("search_path", schema)]);
        }

        if !config.debug {
            options = options.disable_statement_logging();
        }

        Ok(options)
    }

    // sqlx has no cap on idle connections; the closest knob keeps that many
    // warm and reaps the rest after the idle timeout.
    fn pool_options(config: &DbConnectionConfig) -> PgPoolOptions {
        let max = config.max_open_connections.max(1);
        PgPoolOptions::new()
            .max_connections(max)
            .min_connections(config.max_idle_connections.min(max))
            .max_lifetime(Some(config.connection_lifetime()))
            .idle_timeout(Some(config.connection_max_idle_time()))
            .acquire_timeout(config.connect_timeout())
    }
}

/// Open the configured store. Only the SQL backend exists.
pub async fn open_store(config: &StoreConfig) -> Result<Db, DatabaseError> {
    match config.choice {
        StoreChoice::Sql => Db::connect(&config.sql).await,
        other => Err(DatabaseError::UnsupportedStore(other)),
    }
}
