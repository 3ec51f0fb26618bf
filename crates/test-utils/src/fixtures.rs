//! Common fixtures for biomass pipeline tests.

use biomass_common::geometry::Geometry;
use biomass_common::index::SensorGroup;
use biomass_common::request::{AnalysisRequest, BatchTileRequest, PixelRequest};
use chrono::NaiveDate;
use ee_client::query::{collections, SceneQuery};
use ee_client::reduce::BandValues;

/// A small square field near Warsaw, roughly 1 km on a side.
pub fn square_aoi() -> Geometry {
    Geometry::polygon(vec![
        [21.0, 52.0],
        [21.01, 52.0],
        [21.01, 52.01],
        [21.0, 52.01],
        [21.0, 52.0],
    ])
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap_or_else(|_| panic!("bad test date: {}", s))
}

/// Band values from `(band, value)` pairs.
pub fn band_values(pairs: &[(&str, f64)]) -> BandValues {
    let mut values = BandValues::new();
    for (band, value) in pairs {
        values.insert(band, Some(*value));
    }
    values
}

/// Collection query matching what the pipeline issues for a group.
pub fn query(group: SensorGroup, start: &str, end: &str) -> SceneQuery {
    let collections: &[&str] = match group {
        SensorGroup::Multispectral => &[collections::SENTINEL2_SR],
        SensorGroup::Thermal => &[collections::LANDSAT8_L2, collections::LANDSAT9_L2],
    };
    SceneQuery::new(collections, square_aoi(), date(start), date(end))
}

/// An analysis request over [`square_aoi`].
pub fn analysis_request(field_id: &str, indices: &[&str], start: &str, end: &str) -> AnalysisRequest {
    AnalysisRequest {
        field_id: field_id.to_string(),
        geojson: square_aoi(),
        start_date: date(start),
        end_date: date(end),
        indices: indices.iter().map(|s| s.to_string()).collect(),
        cloud_cover: 20,
        sensor: None,
    }
}

/// A batch tile request over [`square_aoi`].
pub fn batch_tile_request(indices: &[&str], day: &str) -> BatchTileRequest {
    BatchTileRequest {
        geojson: square_aoi(),
        date: date(day),
        indices: indices.iter().map(|s| s.to_string()).collect(),
        cloud_cover: 20,
        sensor: None,
    }
}

/// A pixel request at the center of [`square_aoi`].
pub fn pixel_request(indices: &[&str], day: &str) -> PixelRequest {
    PixelRequest {
        geojson: square_aoi(),
        lat: 52.005,
        lng: 21.005,
        date: date(day),
        indices: indices.iter().map(|s| s.to_string()).collect(),
        cloud_cover: 20,
        sensor: None,
    }
}
