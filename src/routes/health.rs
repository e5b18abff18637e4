use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use crate::db;
use crate::state::AppState;

/// Always 200; a failing store is reported in the body.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = if db::ping(&state.db) {
        "connected"
    } else {
        tracing::warn!("Health check: database unreachable");
        "disconnected"
    };

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "database": database,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}
