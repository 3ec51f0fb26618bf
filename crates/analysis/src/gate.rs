//! Cloud and quality gating.
//!
//! Contamination is handled in two stages. Scene-level: the collection
//! query carries a metadata cloudiness prefilter, so obviously overcast
//! scenes never enter a composite. Pixel-level: every scene is masked
//! per-pixel before compositing, and the fraction of the AOI still carrying
//! data afterwards (the clear ratio) decides whether the date is reported
//! at all.
//!
//! Multispectral scenes are masked on the scene classification band,
//! thermal scenes on QA bit flags, and thermal bands are additionally
//! rescaled to physical units while the scene is being prepared.

use biomass_common::geometry::Geometry;
use biomass_common::index::SensorGroup;
use chrono::NaiveDate;
use ee_client::expr::{CompositeMode, ImageExpr};
use ee_client::query::{collections, SceneQuery};

/// Minimum fraction of the AOI that must remain unmasked for a date to
/// produce a time-series entry. Dates below this are silently dropped.
pub const MIN_CLEAR_RATIO: f64 = 0.80;

/// Band name the clear ratio rides along under in per-date reductions.
pub const CLEAR_RATIO_BAND: &str = "clear_ratio";

/// Scene classification values kept by the multispectral mask: vegetation,
/// bare soil, water, unclassified and dark-area pixels. Everything else
/// (clouds, shadows, cirrus, snow, saturated) is masked out.
const CLEAR_SCL_CLASSES: [f64; 5] = [2.0, 4.0, 5.0, 6.0, 7.0];

const QA_BIT_DILATED_CLOUD: u32 = 1;
const QA_BIT_CLOUD: u32 = 3;
const QA_BIT_CLOUD_SHADOW: u32 = 4;

/// Reflectance DN to surface reflectance (Collection 2 Level-2).
const SR_SCALE: f64 = 0.0000275;
const SR_OFFSET: f64 = -0.2;
/// Thermal DN to Kelvin (Collection 2 Level-2).
const ST_SCALE: f64 = 0.00341802;
const ST_OFFSET: f64 = 149.0;

/// Collection query for one sensor group over a half-open date window,
/// with the scene-level cloudiness prefilter attached.
pub fn scene_query(
    group: SensorGroup,
    aoi: &Geometry,
    start: NaiveDate,
    end: NaiveDate,
    cloud_cover: u8,
) -> SceneQuery {
    match group {
        SensorGroup::Multispectral => {
            SceneQuery::new(&[collections::SENTINEL2_SR], aoi.clone(), start, end)
                .with_cloud_filter("CLOUDY_PIXEL_PERCENTAGE", cloud_cover as f64)
        }
        SensorGroup::Thermal => SceneQuery::new(
            &[collections::LANDSAT8_L2, collections::LANDSAT9_L2],
            aoi.clone(),
            start,
            end,
        )
        .with_cloud_filter("CLOUD_COVER", cloud_cover as f64),
    }
}

fn multispectral_clear_mask() -> ImageExpr {
    let scl = ImageExpr::scene().select("SCL");
    let mut mask = scl.eq(CLEAR_SCL_CLASSES[0]);
    for class in &CLEAR_SCL_CLASSES[1..] {
        mask = mask.or(scl.eq(*class));
    }
    mask
}

fn thermal_clear_mask() -> ImageExpr {
    let qa = ImageExpr::scene().select("QA_PIXEL");
    qa.bitwise_and(1 << QA_BIT_CLOUD)
        .eq(0.0)
        .and(qa.bitwise_and(1 << QA_BIT_CLOUD_SHADOW).eq(0.0))
        .and(qa.bitwise_and(1 << QA_BIT_DILATED_CLOUD).eq(0.0))
}

/// Per-scene preparation applied inside composites: mask contaminated
/// pixels, and for thermal scenes rescale DN bands to reflectance/Kelvin.
pub fn masked_scene_transform(group: SensorGroup) -> ImageExpr {
    match group {
        SensorGroup::Multispectral => ImageExpr::scene().update_mask(multispectral_clear_mask()),
        SensorGroup::Thermal => ImageExpr::scene()
            .update_mask(thermal_clear_mask())
            .scale_bands("SR_B", SR_SCALE, SR_OFFSET)
            .scale_bands("ST_B", ST_SCALE, ST_OFFSET),
    }
}

/// Composite over a query with the group's per-scene preparation applied.
pub fn masked_composite(group: SensorGroup, query: SceneQuery, mode: CompositeMode) -> ImageExpr {
    ImageExpr::composite_with(query, mode, masked_scene_transform(group))
}

/// Band whose validity stands in for the whole scene when measuring the
/// clear ratio.
pub fn reference_band(group: SensorGroup) -> &'static str {
    match group {
        SensorGroup::Multispectral => "B8",
        SensorGroup::Thermal => "SR_B5",
    }
}

/// Validity band over a masked composite: 1 where the reference band
/// carries data, 0 where masking removed it. Its AOI mean is the clear
/// ratio, so it rides along in the same reduction as the index bands.
pub fn clear_ratio_band(group: SensorGroup, composite: &ImageExpr) -> ImageExpr {
    composite
        .select(reference_band(group))
        .mask()
        .rename(CLEAR_RATIO_BAND)
}

pub fn meets_clear_ratio(ratio: f64) -> bool {
    ratio >= MIN_CLEAR_RATIO
}
