use axum::response::Json;
use serde_json::{json, Value};
use tracing::info;

/// GET /v1/health - liveness only, no dependency checks
pub async fn get() -> Json<Value> {
    info!("Health check.");
    Json(json!({ "status": "up" }))
}
