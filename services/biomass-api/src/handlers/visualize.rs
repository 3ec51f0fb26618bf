//! Visualization handlers: tile layers and pixel sampling.

use std::sync::Arc;

use analysis::{sample_pixel, BatchTileResult, PixelSample, TileLayer};
use axum::extract::Extension;
use axum::Json;
use biomass_common::request::{AnalysisRequest, BatchTileRequest, PixelRequest};
use tracing::instrument;

use super::ApiError;
use crate::state::AppState;

/// POST /visualize/map - Tile layer for the request's first index.
#[instrument(skip(state, request), fields(field = %request.field_id))]
pub async fn map_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<TileLayer>, ApiError> {
    let layer = state.tiles.single_layer(&request).await?;
    Ok(Json(layer))
}

/// POST /visualize/map/batch - Every requested layer over one date.
#[instrument(skip(state, request), fields(date = %request.date))]
pub async fn map_batch_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<BatchTileRequest>,
) -> Result<Json<BatchTileResult>, ApiError> {
    let result = state.tiles.batch(&request).await?;
    Ok(Json(result))
}

/// POST /visualize/pixel - Index values at one point on one date.
#[instrument(skip(state, request), fields(date = %request.date))]
pub async fn pixel_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<PixelRequest>,
) -> Result<Json<PixelSample>, ApiError> {
    let sample = sample_pixel(state.imagery.as_ref(), &request).await?;
    Ok(Json(sample))
}
