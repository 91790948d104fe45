use axum::Json;
use serde_json::{json, Value};

/// Liveness probe for the reverse proxy and container health checks.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
