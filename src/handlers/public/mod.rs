// handlers/public/mod.rs - endpoints reachable without a user ID
//
// Route prefix: /v1 (e.g. /v1/health)
// Middleware: request context only

pub mod health;

use axum::{routing::get, Router};

use crate::handlers::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/health", get(health::get))
}
