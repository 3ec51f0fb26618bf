//! Request payloads and their validation.
//!
//! Wire types mirror the JSON the API accepts; validation turns them into
//! the typed forms the pipeline consumes. Every input problem is caught
//! here, before any remote imagery call is issued.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{BiomassError, BiomassResult};
use crate::geometry::Geometry;
use crate::index::{SensorGroup, VegetationIndex, DEFAULT_INDICES};

/// Scene-level cloud-cover prefilter applied when a request does not set
/// one, in percent.
pub const DEFAULT_CLOUD_COVER: u8 = 20;

fn default_cloud_cover() -> u8 {
    DEFAULT_CLOUD_COVER
}

/// Analysis request as received on the wire.
///
/// Also used for single-layer tile requests, which interpret an equal
/// start/end date as a one-day window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub field_id: String,
    pub geojson: Geometry,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Index names; defaults apply when empty.
    #[serde(default)]
    pub indices: Vec<String>,
    /// Scene-level cloud-cover threshold in percent.
    #[serde(default = "default_cloud_cover")]
    pub cloud_cover: u8,
    /// Sensor hint, only consulted for true-color requests.
    #[serde(default)]
    pub sensor: Option<String>,
}

/// A validated analysis/tile request.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub field_id: String,
    pub aoi: Geometry,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Requested indices, deduplicated, in request order.
    pub indices: Vec<VegetationIndex>,
    pub cloud_cover: u8,
    pub sensor_hint: Option<SensorGroup>,
}

impl AnalysisRequest {
    /// Validate the request for any use.
    pub fn validate(&self) -> BiomassResult<ValidatedRequest> {
        if self.field_id.trim().is_empty() {
            return Err(BiomassError::InvalidRequest(
                "field_id must not be empty".to_string(),
            ));
        }
        self.geojson.validate_aoi()?;
        validate_date_range(self.start_date, self.end_date)?;
        validate_cloud_cover(self.cloud_cover)?;
        let indices = parse_indices(&self.indices)?;
        let sensor_hint = parse_sensor_hint(self.sensor.as_deref())?;

        Ok(ValidatedRequest {
            field_id: self.field_id.trim().to_string(),
            aoi: self.geojson.clone(),
            start: self.start_date,
            end: self.end_date,
            indices,
            cloud_cover: self.cloud_cover,
            sensor_hint,
        })
    }

    /// Validate for time-series analysis, where every requested index must
    /// produce a measured value (true-color is visualization-only).
    pub fn validate_for_analysis(&self) -> BiomassResult<ValidatedRequest> {
        let validated = self.validate()?;
        if let Some(index) = validated.indices.iter().find(|i| !i.is_measured()) {
            return Err(BiomassError::InvalidRequest(format!(
                "{} is visualization-only and has no time-series value",
                index
            )));
        }
        Ok(validated)
    }
}

/// Batch tile request: many layers over one date and one sensor group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTileRequest {
    pub geojson: Geometry,
    pub date: NaiveDate,
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default = "default_cloud_cover")]
    pub cloud_cover: u8,
    #[serde(default)]
    pub sensor: Option<String>,
}

/// A validated batch tile request.
#[derive(Debug, Clone)]
pub struct ValidatedBatchRequest {
    pub aoi: Geometry,
    pub date: NaiveDate,
    pub group: SensorGroup,
    /// Requested layers, deduplicated, in request order.
    pub indices: Vec<VegetationIndex>,
    pub cloud_cover: u8,
}

impl BatchTileRequest {
    pub fn validate(&self) -> BiomassResult<ValidatedBatchRequest> {
        self.geojson.validate_aoi()?;
        validate_cloud_cover(self.cloud_cover)?;
        let indices = parse_indices(&self.indices)?;
        let sensor_hint = parse_sensor_hint(self.sensor.as_deref())?;
        let group = resolve_group(&indices, sensor_hint)?;

        Ok(ValidatedBatchRequest {
            aoi: self.geojson.clone(),
            date: self.date,
            group,
            indices,
            cloud_cover: self.cloud_cover,
        })
    }
}

/// Pixel sampling request: index values at one point on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixelRequest {
    pub geojson: Geometry,
    pub lat: f64,
    pub lng: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default = "default_cloud_cover")]
    pub cloud_cover: u8,
    #[serde(default)]
    pub sensor: Option<String>,
}

/// A validated pixel sampling request.
#[derive(Debug, Clone)]
pub struct ValidatedPixelRequest {
    pub aoi: Geometry,
    pub lat: f64,
    pub lng: f64,
    pub date: NaiveDate,
    pub group: SensorGroup,
    pub indices: Vec<VegetationIndex>,
    pub cloud_cover: u8,
}

impl PixelRequest {
    pub fn validate(&self) -> BiomassResult<ValidatedPixelRequest> {
        self.geojson.validate_aoi()?;
        validate_cloud_cover(self.cloud_cover)?;
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(BiomassError::InvalidRequest(format!(
                "latitude out of range: {}",
                self.lat
            )));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(BiomassError::InvalidRequest(format!(
                "longitude out of range: {}",
                self.lng
            )));
        }
        let indices = parse_indices(&self.indices)?;
        if let Some(index) = indices.iter().find(|i| !i.is_measured()) {
            return Err(BiomassError::InvalidRequest(format!(
                "{} cannot be sampled at a point",
                index
            )));
        }
        let sensor_hint = parse_sensor_hint(self.sensor.as_deref())?;
        let group = resolve_group(&indices, sensor_hint)?;

        Ok(ValidatedPixelRequest {
            aoi: self.geojson.clone(),
            lat: self.lat,
            lng: self.lng,
            date: self.date,
            group,
            indices,
            cloud_cover: self.cloud_cover,
        })
    }

    /// The sampling location as a GeoJSON point.
    pub fn point(&self) -> Geometry {
        Geometry::point(self.lng, self.lat)
    }
}

impl ValidatedPixelRequest {
    pub fn point(&self) -> Geometry {
        Geometry::point(self.lng, self.lat)
    }
}

fn validate_date_range(start: NaiveDate, end: NaiveDate) -> BiomassResult<()> {
    if start > end {
        return Err(BiomassError::InvalidDateRange(format!(
            "start {} is after end {}",
            start, end
        )));
    }
    Ok(())
}

fn validate_cloud_cover(percent: u8) -> BiomassResult<()> {
    if percent > 100 {
        return Err(BiomassError::InvalidRequest(format!(
            "cloud_cover must be 0-100, got {}",
            percent
        )));
    }
    Ok(())
}

/// Parse index names into the typed registry, applying defaults for an
/// empty list and deduplicating while preserving request order.
fn parse_indices(names: &[String]) -> BiomassResult<Vec<VegetationIndex>> {
    if names.is_empty() {
        return Ok(DEFAULT_INDICES.to_vec());
    }
    let mut indices = Vec::with_capacity(names.len());
    for name in names {
        let index = VegetationIndex::parse(name)
            .ok_or_else(|| BiomassError::UnknownIndex(name.clone()))?;
        if !indices.contains(&index) {
            indices.push(index);
        }
    }
    Ok(indices)
}

fn parse_sensor_hint(hint: Option<&str>) -> BiomassResult<Option<SensorGroup>> {
    match hint {
        None => Ok(None),
        Some(raw) => SensorGroup::parse_hint(raw)
            .map(Some)
            .ok_or_else(|| BiomassError::InvalidRequest(format!("unknown sensor: {}", raw))),
    }
}

/// Resolve the single sensor group a tile/pixel request operates on.
///
/// Measured indices pin the group and must all agree; a pure true-color
/// request falls back to the hint, then to multispectral.
fn resolve_group(
    indices: &[VegetationIndex],
    hint: Option<SensorGroup>,
) -> BiomassResult<SensorGroup> {
    let mut measured_groups: Vec<SensorGroup> = indices
        .iter()
        .filter(|i| i.is_measured())
        .map(|i| i.sensor_group())
        .collect();
    measured_groups.sort();
    measured_groups.dedup();

    match measured_groups.as_slice() {
        [] => Ok(hint.unwrap_or(SensorGroup::Multispectral)),
        [group] => Ok(*group),
        _ => Err(BiomassError::InvalidRequest(
            "requested indices span more than one sensor group".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aoi() -> Geometry {
        Geometry::polygon(vec![
            [21.0, 52.0],
            [21.01, 52.0],
            [21.01, 52.01],
            [21.0, 52.01],
            [21.0, 52.0],
        ])
    }

    fn request(indices: &[&str]) -> AnalysisRequest {
        AnalysisRequest {
            field_id: "field-7".to_string(),
            geojson: aoi(),
            start_date: "2024-05-01".parse().unwrap(),
            end_date: "2024-06-01".parse().unwrap(),
            indices: indices.iter().map(|s| s.to_string()).collect(),
            cloud_cover: 20,
            sensor: None,
        }
    }

    #[test]
    fn test_defaults_applied_for_empty_indices() {
        let validated = request(&[]).validate().unwrap();
        assert_eq!(validated.indices, DEFAULT_INDICES.to_vec());
        assert_eq!(validated.cloud_cover, 20);
    }

    #[test]
    fn test_wire_defaults() {
        let json = r#"{
            "field_id": "f1",
            "geojson": {"type":"Polygon","coordinates":[[[21.0,52.0],[21.01,52.0],[21.01,52.01],[21.0,52.0]]]},
            "start_date": "2024-05-01",
            "end_date": "2024-06-01"
        }"#;
        let req: AnalysisRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.cloud_cover, DEFAULT_CLOUD_COVER);
        assert!(req.indices.is_empty());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_unknown_index_rejected() {
        let err = request(&["NDVI", "NDWI"]).validate().unwrap_err();
        match err {
            BiomassError::UnknownIndex(name) => assert_eq!(name, "NDWI"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_indices_collapse_preserving_order() {
        let validated = request(&["EVI", "NDVI", "EVI", "LST"]).validate().unwrap();
        assert_eq!(
            validated.indices,
            vec![
                VegetationIndex::Evi,
                VegetationIndex::Ndvi,
                VegetationIndex::Lst
            ]
        );
    }

    #[test]
    fn test_reversed_date_range_rejected() {
        let mut req = request(&["NDVI"]);
        req.start_date = "2024-06-01".parse().unwrap();
        req.end_date = "2024-05-01".parse().unwrap();
        assert!(matches!(
            req.validate(),
            Err(BiomassError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn test_empty_field_id_rejected() {
        let mut req = request(&["NDVI"]);
        req.field_id = "  ".to_string();
        assert!(matches!(
            req.validate(),
            Err(BiomassError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_cloud_cover_over_100_rejected() {
        let mut req = request(&["NDVI"]);
        req.cloud_cover = 101;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_analysis_rejects_true_color() {
        let err = request(&["NDVI", "RGB"])
            .validate_for_analysis()
            .unwrap_err();
        assert_eq!(err.http_status_code(), 400);
        // Plain validation (used by the tile endpoint) accepts it.
        assert!(request(&["NDVI", "RGB"]).validate().is_ok());
    }

    fn batch_request(indices: &[&str], sensor: Option<&str>) -> BatchTileRequest {
        BatchTileRequest {
            geojson: aoi(),
            date: "2024-05-01".parse().unwrap(),
            indices: indices.iter().map(|s| s.to_string()).collect(),
            cloud_cover: 20,
            sensor: sensor.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_batch_group_resolution() {
        let validated = batch_request(&["EVI", "NDVI", "RGB"], None).validate().unwrap();
        assert_eq!(validated.group, SensorGroup::Multispectral);
        assert_eq!(validated.indices.len(), 3);

        let validated = batch_request(&["LST", "TVDI"], None).validate().unwrap();
        assert_eq!(validated.group, SensorGroup::Thermal);
    }

    #[test]
    fn test_batch_mixed_groups_rejected() {
        assert!(batch_request(&["NDVI", "LST"], None).validate().is_err());
    }

    #[test]
    fn test_batch_true_color_uses_hint() {
        let validated = batch_request(&["RGB"], Some("thermal")).validate().unwrap();
        assert_eq!(validated.group, SensorGroup::Thermal);

        let validated = batch_request(&["RGB"], None).validate().unwrap();
        assert_eq!(validated.group, SensorGroup::Multispectral);
    }

    #[test]
    fn test_unknown_sensor_hint_rejected() {
        assert!(batch_request(&["RGB"], Some("modis")).validate().is_err());
    }

    fn pixel_request(indices: &[&str]) -> PixelRequest {
        PixelRequest {
            geojson: aoi(),
            lat: 52.005,
            lng: 21.005,
            date: "2024-05-01".parse().unwrap(),
            indices: indices.iter().map(|s| s.to_string()).collect(),
            cloud_cover: 20,
            sensor: None,
        }
    }

    #[test]
    fn test_pixel_validation() {
        let validated = pixel_request(&["NDVI", "EVI"]).validate().unwrap();
        assert_eq!(validated.group, SensorGroup::Multispectral);
        assert_eq!(
            validated.point(),
            Geometry::point(21.005, 52.005)
        );
    }

    #[test]
    fn test_pixel_rejects_true_color() {
        assert!(pixel_request(&["RGB"]).validate().is_err());
    }

    #[test]
    fn test_pixel_rejects_out_of_range_point() {
        let mut req = pixel_request(&["NDVI"]);
        req.lat = 91.0;
        assert!(req.validate().is_err());
    }
}
