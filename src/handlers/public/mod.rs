// handlers/public/mod.rs - Public handlers (no authentication)

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

/// GET / - service name and version
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Coffee Shop API",
            "version": version,
            "endpoints": {
                "drinks": "GET /drinks (get:drinks), POST /drinks (post:drinks)",
                "drinks-detail": "GET /drinks-detail (get:drinks-detail)",
                "drink": "PATCH /drinks/:id (patch:drinks), DELETE /drinks/:id (delete:drinks)",
                "health": "GET /health (public)",
            }
        }
    }))
}

/// GET /health - liveness plus a store ping
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if let Err(e) = state.store.ping().await {
        tracing::warn!("Health check failed: {}", e);
        return Err(ApiError::service_unavailable("database unavailable"));
    }

    Ok(Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "database": "ok"
        }
    })))
}

/// Router fallback for unknown paths
pub async fn not_found() -> ApiError {
    ApiError::not_found("resource not found")
}
