//! Regional reductions and their results.

use std::collections::BTreeMap;

use biomass_common::geometry::Geometry;
use serde::{Deserialize, Serialize};

/// Pixel cap for regional reductions.
pub const DEFAULT_MAX_PIXELS: u64 = 1_000_000_000;

/// How pixel values inside a region collapse to per-band numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reducer {
    /// Mean of unmasked pixels per band.
    Mean,
    /// Minimum and maximum per band, reported as `{band}_min` / `{band}_max`.
    MinMax,
    /// Value of the first pixel intersecting the region.
    First,
}

/// A reduction of an image over a geometry at a ground sample distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionReduction {
    pub reducer: Reducer,
    pub geometry: Geometry,
    /// Ground sample distance in meters.
    pub scale: f64,
    pub max_pixels: u64,
}

impl RegionReduction {
    fn new(reducer: Reducer, geometry: Geometry, scale: f64) -> Self {
        Self {
            reducer,
            geometry,
            scale,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }

    pub fn mean(geometry: Geometry, scale: f64) -> Self {
        Self::new(Reducer::Mean, geometry, scale)
    }

    pub fn min_max(geometry: Geometry, scale: f64) -> Self {
        Self::new(Reducer::MinMax, geometry, scale)
    }

    pub fn first(geometry: Geometry, scale: f64) -> Self {
        Self::new(Reducer::First, geometry, scale)
    }
}

/// Band name to value mapping returned by a reduction. A `null` value means
/// the band had no unmasked pixels inside the region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandValues(pub BTreeMap<String, Option<f64>>);

impl BandValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, band: &str, value: Option<f64>) {
        self.0.insert(band.to_string(), value);
    }

    /// Value for a band, flattening "band absent" and "band null" to `None`.
    pub fn get(&self, band: &str) -> Option<f64> {
        self.0.get(band).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<f64>)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_values_flatten_nulls() {
        let mut values = BandValues::new();
        values.insert("NDVI", Some(0.42));
        values.insert("EVI", None);

        assert_eq!(values.get("NDVI"), Some(0.42));
        assert_eq!(values.get("EVI"), None);
        assert_eq!(values.get("SAVI"), None);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_band_values_round_trip_transparent() {
        let mut values = BandValues::new();
        values.insert("NDVI", Some(0.42));
        values.insert("clear_ratio", None);

        let json = serde_json::to_value(&values).unwrap();
        assert_eq!(json["NDVI"], 0.42);
        assert!(json["clear_ratio"].is_null());

        let back: BandValues = serde_json::from_value(json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_reduction_defaults() {
        let reduction = RegionReduction::mean(Geometry::point(21.0, 52.0), 10.0);
        assert_eq!(reduction.reducer, Reducer::Mean);
        assert_eq!(reduction.max_pixels, DEFAULT_MAX_PIXELS);
    }
}
