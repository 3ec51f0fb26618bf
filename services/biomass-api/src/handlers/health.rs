//! Health and readiness probes.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::AppState;

/// GET /health - Liveness check.
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "biomass-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /ready - Readiness check (verifies storage when configured).
pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    match &state.store {
        Some(store) => match store.history("readiness-probe").await {
            Ok(_) => (StatusCode::OK, "Ready"),
            Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
        },
        None => (StatusCode::OK, "Ready"),
    }
}
