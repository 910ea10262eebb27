use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::db;
use crate::state::AppState;

/// GET /health
/// Reports service version and whether Postgres answers.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match db::ping(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "database": "connected",
                "version": env!("CARGO_PKG_VERSION"),
                "service": "questline-api"
            })),
        ),
        Err(e) => {
            warn!("Health check could not reach the database: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "database": "disconnected",
                    "version": env!("CARGO_PKG_VERSION"),
                    "service": "questline-api"
                })),
            )
        }
    }
}
