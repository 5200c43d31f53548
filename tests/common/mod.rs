#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use tokio::sync::oneshot;

use image_analyzer::config::ServerConfig;
use image_analyzer::repositories::ImageMetadataRepo;
use image_analyzer::server::{self, Server};
use image_analyzer::testing::app_state;

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Serve the full router over `repo` on an unused local port.
    pub async fn spawn(repo: Arc<dyn ImageMetadataRepo>) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            address: format!("127.0.0.1:{}", port),
            shutdown_timeout_secs: 2,
        };
        let server = Server::new(config, server::app(app_state(repo)));
        let listener = server.bind().await.context("failed to bind test port")?;

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(server.run(listener, async move {
            let _ = rx.await;
        }));

        let server = Self {
            port,
            base_url,
            shutdown: Some(tx),
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = client.get(self.url("/v1/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// A throwaway Postgres schema on the database named by `DATABASE_URL`.
/// Every pooled connection has its `search_path` pinned to the schema, so
/// tests can share one database without seeing each other's tables.
pub struct TestDb {
    pub pool: sqlx::PgPool,
    pub schema: String,
    admin: sqlx::PgPool,
}

impl TestDb {
    /// `None` when `DATABASE_URL` is unset; such tests return early.
    pub async fn connect() -> Result<Option<Self>> {
        use std::str::FromStr;

        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping database test");
            return Ok(None);
        };

        let admin = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .context("failed to connect to DATABASE_URL")?;

        let schema = format!("test_{}", uuid::Uuid::new_v4().simple());
        sqlx::query(&format!("CREATE SCHEMA \"{}\"", schema))
            .execute(&admin)
            .await?;

        let options = sqlx::postgres::PgConnectOptions::from_str(&url)?
            .options([("search_path", schema.as_str())]);
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        Ok(Some(Self { pool, schema, admin }))
    }

    pub fn db(&self) -> image_analyzer::database::Db {
        image_analyzer::database::Db::from_pool(self.pool.clone(), self.schema.clone())
    }

    pub async fn count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table);
        Ok(sqlx::query_scalar(&sql).fetch_one(&self.pool).await?)
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let found: Option<String> = sqlx::query_scalar("SELECT to_regclass($1)::text")
            .bind(table)
            .fetch_one(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn cleanup(self) -> Result<()> {
        self.pool.close().await;
        sqlx::query(&format!("DROP SCHEMA \"{}\" CASCADE", self.schema))
            .execute(&self.admin)
            .await?;
        self.admin.close().await;
        Ok(())
    }
}
