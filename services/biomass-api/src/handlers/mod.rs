//! HTTP request handlers for the biomass API.
//!
//! This module is organized into submodules:
//! - `analysis`: time-series analysis and stored measurement history
//! - `visualize`: tile layers (single and batch) and pixel sampling
//! - `health`: liveness and readiness probes

pub mod analysis;
pub mod health;
pub mod visualize;

pub use analysis::{calculate_handler, history_handler, CalculateResponse, HistoryResponse};
pub use health::{health_handler, ready_handler};
pub use visualize::{map_batch_handler, map_handler, pixel_handler};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use biomass_common::error::BiomassError;
use tracing::warn;

/// JSON error envelope carrying the error taxonomy's status code.
#[derive(Debug)]
pub struct ApiError(pub BiomassError);

impl From<BiomassError> for ApiError {
    fn from(err: BiomassError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        }
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}
