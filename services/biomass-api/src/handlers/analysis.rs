//! Analysis and history handlers.

use std::sync::Arc;

use analysis::AnalysisOutcome;
use axum::extract::{Extension, Path};
use axum::Json;
use biomass_common::error::BiomassError;
use biomass_common::request::AnalysisRequest;
use serde::Serialize;
use storage::{MeasurementRecord, UpsertSummary};
use tracing::{info, instrument};

use super::ApiError;
use crate::state::AppState;

/// Response for `POST /calculate/biomass`.
#[derive(Debug, Serialize)]
pub struct CalculateResponse {
    #[serde(flatten)]
    pub outcome: AnalysisOutcome,
    /// Rows written to storage; absent when persistence is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<UpsertSummary>,
}

/// POST /calculate/biomass - Run a field analysis and persist the series.
///
/// The analysis result is returned even when nothing was persisted; a
/// storage failure after a successful analysis is surfaced as an error
/// rather than silently dropping the write.
#[instrument(skip(state, request), fields(field = %request.field_id))]
pub async fn calculate_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let outcome = state.pipeline.run(&request).await?;

    let storage = match &state.store {
        Some(store) => Some(
            store
                .upsert_series(&outcome.metadata.field_id, &outcome.timeseries)
                .await?,
        ),
        None => None,
    };

    Ok(Json(CalculateResponse { outcome, storage }))
}

/// Response for `GET /history/:field_id`.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub field_id: String,
    pub measurements: Vec<MeasurementRecord>,
}

/// GET /history/:field_id - Stored measurements for a field, oldest first.
#[instrument(skip(state))]
pub async fn history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(field_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let store = state
        .store
        .as_ref()
        .ok_or_else(|| BiomassError::Database("measurement persistence is disabled".to_string()))?;

    let measurements = store.history(&field_id).await?;
    info!(rows = measurements.len(), "History request");

    Ok(Json(HistoryResponse {
        field_id,
        measurements,
    }))
}
