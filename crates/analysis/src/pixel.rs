//! Point sampling for map tooltips.
//!
//! Samples the requested index bands at a single location on a single
//! date, over the same masked median composite the tile layers render, so
//! the number under the cursor matches the colors on the map.

use std::collections::BTreeMap;

use biomass_common::error::{BiomassError, BiomassResult};
use biomass_common::index::VegetationIndex;
use biomass_common::request::PixelRequest;
use biomass_common::series::round4;
use chrono::{Duration, NaiveDate};
use ee_client::expr::{CompositeMode, ImageExpr};
use ee_client::reduce::RegionReduction;
use ee_client::ImageryService;
use serde::Serialize;
use tracing::debug;

use crate::catalog::MosaicContext;
use crate::{gate, imagery_error};

/// Values observed at one sampled point.
#[derive(Debug, Clone, Serialize)]
pub struct PixelSample {
    pub lat: f64,
    pub lng: f64,
    pub date: NaiveDate,
    /// Index values at the point; indices masked at the point are absent.
    pub values: BTreeMap<VegetationIndex, f64>,
}

/// Sample index values at a point for one date.
pub async fn sample_pixel(
    imagery: &dyn ImageryService,
    request: &PixelRequest,
) -> BiomassResult<PixelSample> {
    let validated = request.validate()?;
    let end = validated.date + Duration::days(1);

    let query = gate::scene_query(
        validated.group,
        &validated.aoi,
        validated.date,
        end,
        validated.cloud_cover,
    );
    let scenes = imagery.count_scenes(&query).await.map_err(imagery_error)?;
    if scenes == 0 {
        return Err(BiomassError::NoImagery(format!(
            "no {} scenes on {}",
            validated.group, validated.date
        )));
    }

    let composite = gate::masked_composite(validated.group, query, CompositeMode::Median)
        .clip(&validated.aoi);
    let context = MosaicContext::new(validated.group, &composite, &validated.aoi);

    let bands: Vec<ImageExpr> = validated
        .indices
        .iter()
        .filter_map(|&index| context.index_band(index))
        .collect();
    let stacked = ImageExpr::cat(bands);

    let reduction = RegionReduction::first(validated.point(), validated.group.gsd());
    let values = imagery.reduce_region(&stacked, &reduction).await.map_err(imagery_error)?;

    let mut observed = BTreeMap::new();
    for &index in &validated.indices {
        if let Some(value) = values.get(index.name()) {
            observed.insert(index, round4(value));
        }
    }
    debug!(
        lat = validated.lat,
        lng = validated.lng,
        values = observed.len(),
        "Sampled pixel"
    );

    Ok(PixelSample {
        lat: validated.lat,
        lng: validated.lng,
        date: validated.date,
        values: observed,
    })
}
