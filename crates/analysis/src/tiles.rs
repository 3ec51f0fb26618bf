//! Visualization tile layers.
//!
//! Layers are median composites over a date window, clipped to the AOI and
//! published through the imagery service's map endpoint. The batch path
//! prepares every requested layer over one shared composite and resolves
//! the tile URLs concurrently; layers that fail to resolve are dropped from
//! the response rather than failing the batch.

use std::sync::Arc;
use std::time::Instant;

use biomass_common::error::{BiomassError, BiomassResult};
use biomass_common::geometry::Geometry;
use biomass_common::index::{SensorGroup, VegetationIndex};
use biomass_common::request::{AnalysisRequest, BatchTileRequest};
use chrono::{Duration, NaiveDate};
use ee_client::expr::{CompositeMode, ImageExpr};
use ee_client::vis::VisParams;
use ee_client::ImageryService;
use futures::{stream, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::catalog::MosaicContext;
use crate::{gate, imagery_error};

/// Upper bound on concurrently resolved layers within one batch.
pub const MAX_TILE_PARALLEL: usize = 8;

/// True-color stretch for rescaled Landsat reflectance.
const THERMAL_RGB_MAX: f64 = 0.3;

/// One published tile layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    /// URL template with `{z}/{x}/{y}` placeholders.
    pub layer_url: String,
    pub index_name: VegetationIndex,
}

/// All layers resolved for one date of one sensor group.
#[derive(Debug, Clone, Serialize)]
pub struct BatchTileResult {
    pub date: NaiveDate,
    pub sensor: SensorGroup,
    /// Layers in request order; layers that failed to resolve are absent.
    pub layers: Vec<TileLayer>,
    pub elapsed_ms: u64,
}

pub struct TileService {
    imagery: Arc<dyn ImageryService>,
}

impl TileService {
    pub fn new(imagery: Arc<dyn ImageryService>) -> Self {
        Self { imagery }
    }

    /// Resolve a single tile layer for the request's first index.
    ///
    /// An equal start/end date is widened to a one-day window. Unlike the
    /// batch path, a resolution failure here is surfaced to the caller.
    #[instrument(skip(self, request), fields(field = %request.field_id))]
    pub async fn single_layer(&self, request: &AnalysisRequest) -> BiomassResult<TileLayer> {
        let validated = request.validate()?;
        let index = validated.indices[0];
        let group = match index.is_measured() {
            true => index.sensor_group(),
            false => validated.sensor_hint.unwrap_or(SensorGroup::Multispectral),
        };
        let end = if validated.start == validated.end {
            validated.end + Duration::days(1)
        } else {
            validated.end
        };

        let context = self
            .prepare_composite(group, &validated.aoi, validated.start, end, validated.cloud_cover)
            .await?;
        let (expr, vis) = layer_expression(&context, index).ok_or_else(|| {
            BiomassError::Internal(format!("no band expression for {}", index))
        })?;

        let layer_url = self.imagery.tile_url(&expr, &vis).await.map_err(imagery_error)?;
        Ok(TileLayer {
            layer_url,
            index_name: index,
        })
    }

    /// Resolve every requested layer over one shared one-day composite.
    #[instrument(skip(self, request), fields(date = %request.date))]
    pub async fn batch(&self, request: &BatchTileRequest) -> BiomassResult<BatchTileResult> {
        let started = Instant::now();
        let validated = request.validate()?;
        let end = validated.date + Duration::days(1);

        let context = self
            .prepare_composite(
                validated.group,
                &validated.aoi,
                validated.date,
                end,
                validated.cloud_cover,
            )
            .await?;

        let prepared: Vec<(usize, VegetationIndex, ImageExpr, VisParams)> = validated
            .indices
            .iter()
            .enumerate()
            .filter_map(|(seq, &index)| {
                layer_expression(&context, index).map(|(expr, vis)| (seq, index, expr, vis))
            })
            .collect();

        let parallel = prepared.len().clamp(1, MAX_TILE_PARALLEL);
        let mut resolved = stream::iter(prepared)
            .map(|(seq, index, expr, vis)| {
                let imagery = self.imagery.clone();
                async move { (seq, index, imagery.tile_url(&expr, &vis).await) }
            })
            .buffer_unordered(parallel)
            .collect::<Vec<_>>()
            .await;

        // Completion order is arbitrary; the sequence restores request order.
        resolved.sort_by_key(|(seq, _, _)| *seq);
        let mut layers = Vec::with_capacity(resolved.len());
        for (_, index, result) in resolved {
            match result {
                Ok(layer_url) => layers.push(TileLayer {
                    layer_url,
                    index_name: index,
                }),
                Err(err) => {
                    warn!(index = %index, error = %err, "Tile layer failed to resolve");
                }
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            sensor = %validated.group,
            layers = layers.len(),
            elapsed_ms,
            "Resolved tile batch"
        );
        Ok(BatchTileResult {
            date: validated.date,
            sensor: validated.group,
            layers,
            elapsed_ms,
        })
    }

    /// Median composite for a window, failing with `NoImagery` when the
    /// query matches no scenes at all.
    async fn prepare_composite(
        &self,
        group: SensorGroup,
        aoi: &Geometry,
        start: NaiveDate,
        end: NaiveDate,
        cloud_cover: u8,
    ) -> BiomassResult<MosaicContext> {
        let query = gate::scene_query(group, aoi, start, end, cloud_cover);
        let scenes = self.imagery.count_scenes(&query).await.map_err(imagery_error)?;
        if scenes == 0 {
            return Err(BiomassError::NoImagery(format!(
                "no {} scenes under {}% cloud between {} and {}",
                group, cloud_cover, start, end
            )));
        }

        let composite = gate::masked_composite(group, query, CompositeMode::Median).clip(aoi);
        Ok(MosaicContext::new(group, &composite, aoi))
    }
}

/// Band expression and stretch for one layer over a prepared composite.
fn layer_expression(
    context: &MosaicContext,
    index: VegetationIndex,
) -> Option<(ImageExpr, VisParams)> {
    if index == VegetationIndex::TrueColor {
        return Some(true_color(context));
    }
    let expr = context.index_band(index)?;
    let spec = index.vis_spec();
    Some((expr, VisParams::ramp(spec.min, spec.max, spec.palette)))
}

/// True-color band triple for the context's sensor group.
fn true_color(context: &MosaicContext) -> (ImageExpr, VisParams) {
    let spec = VegetationIndex::TrueColor.vis_spec();
    match context.group() {
        SensorGroup::Multispectral => {
            let bands = ["B4", "B3", "B2"];
            (
                context.mosaic().select_bands(&bands),
                VisParams::rgb(&bands, spec.min, spec.max),
            )
        }
        // Rescaled reflectance, not DN; the stretch domain differs.
        SensorGroup::Thermal => {
            let bands = ["SR_B4", "SR_B3", "SR_B2"];
            (
                context.mosaic().select_bands(&bands),
                VisParams::rgb(&bands, 0.0, THERMAL_RGB_MAX),
            )
        }
    }
}
