use axum::Json;
use serde_json::json;

/// GET /health and /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "Server is running" }))
}
