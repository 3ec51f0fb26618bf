//! Scene collection queries.
//!
//! A [`SceneQuery`] names the collections to merge and the spatial, temporal
//! and scene-metadata filters to apply. It is embedded in composite image
//! expressions and sent verbatim to the discovery endpoints.

use biomass_common::geometry::Geometry;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Collection identifiers understood by the remote service.
pub mod collections {
    /// Sentinel-2 surface reflectance, harmonized across processing baselines.
    pub const SENTINEL2_SR: &str = "COPERNICUS/S2_SR_HARMONIZED";
    /// Landsat 8 Collection 2 Tier 1 Level-2.
    pub const LANDSAT8_L2: &str = "LANDSAT/LC08/C02/T1_L2";
    /// Landsat 9 Collection 2 Tier 1 Level-2.
    pub const LANDSAT9_L2: &str = "LANDSAT/LC09/C02/T1_L2";
}

/// Scene-metadata cloudiness filter, `property < max_percent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudFilter {
    pub property: String,
    pub max_percent: f64,
}

/// Filtered view over one or more scene collections.
///
/// Collections are merged in order. The date window is half-open: scenes
/// acquired on `start` are included, scenes acquired on `end` are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneQuery {
    pub collections: Vec<String>,
    pub aoi: Geometry,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cloud_filter: Option<CloudFilter>,
}

impl SceneQuery {
    pub fn new(collections: &[&str], aoi: Geometry, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            collections: collections.iter().map(|c| c.to_string()).collect(),
            aoi,
            start,
            end,
            cloud_filter: None,
        }
    }

    pub fn with_cloud_filter(mut self, property: &str, max_percent: f64) -> Self {
        self.cloud_filter = Some(CloudFilter {
            property: property.to_string(),
            max_percent,
        });
        self
    }
}
