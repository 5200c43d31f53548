// handlers/protected/mod.rs - endpoints that require an authenticated user
//
// Route prefix: /v1/images
// Middleware: token_auth (x-user-id) on matched routes only, so unknown paths
// still answer 404 rather than 401.

pub mod images;

use axum::{middleware, routing::post, Router};

use crate::handlers::AppState;
use crate::middleware::token_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/images", post(images::create))
        .route_layer(middleware::from_fn(token_auth))
}
