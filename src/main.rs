use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use image_analyzer::config::AppConfig;
use image_analyzer::database::{open_store, Repo};
use image_analyzer::handlers::AppState;
use image_analyzer::logging;
use image_analyzer::repositories::SqlImageMetadataRepo;
use image_analyzer::server::{self, Server};
use image_analyzer::services::{ImageMetadataService, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up DB_* overrides.
    let _ = dotenvy::dotenv();

    let config = AppConfig::load().context("failed to load configuration")?;
    logging::init(&config.log);
    info!(env = %config.app.env, service = %config.app.service_name, "starting");

    let db = open_store(&config.store)
        .await
        .context("could not open database")?;

    let repo = SqlImageMetadataRepo::new(Repo::new(db.clone()));
    let images = ImageMetadataService::new(ServiceConfig {
        repo: Arc::new(repo),
    });
    let router = server::app(AppState::new(images));

    let server = Server::new(config.server.clone(), router);
    let listener = server
        .bind()
        .await
        .with_context(|| format!("failed to bind {}", config.server.address))?;

    let result = server.run(listener, server::shutdown_signal()).await;
    db.close().await;
    result.context("server error")
}
