//! GeoJSON geometry types for areas of interest.
//!
//! Requests carry their AOI as a GeoJSON geometry object. Only the
//! geometry kinds the pipeline actually consumes are modelled: polygons
//! (with arbitrary ring counts) for analysis regions and points for
//! pixel sampling.

use serde::{Deserialize, Serialize};

use crate::error::{BiomassError, BiomassResult};

/// A GeoJSON geometry, tagged by its `type` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A point as [longitude, latitude].
    Point { coordinates: [f64; 2] },

    /// A polygon: one exterior ring plus optional holes.
    /// Each ring is an array of [longitude, latitude] positions.
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },

    /// A multi-polygon (array of polygon coordinate arrays).
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

impl Geometry {
    /// Create a point geometry.
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point {
            coordinates: [lon, lat],
        }
    }

    /// Create a single-ring polygon.
    pub fn polygon(ring: Vec<[f64; 2]>) -> Self {
        Geometry::Polygon {
            coordinates: vec![ring],
        }
    }

    /// Whether this geometry has a surface (polygon or multi-polygon).
    pub fn is_areal(&self) -> bool {
        matches!(
            self,
            Geometry::Polygon { .. } | Geometry::MultiPolygon { .. }
        )
    }

    /// Validate the geometry as an analysis AOI.
    ///
    /// The AOI must be areal, every ring must be closed GeoJSON-style
    /// (at least four positions), and every coordinate must be a finite
    /// lon/lat pair.
    pub fn validate_aoi(&self) -> BiomassResult<()> {
        match self {
            Geometry::Point { .. } => Err(BiomassError::InvalidGeometry(
                "AOI must be a Polygon or MultiPolygon".to_string(),
            )),
            Geometry::Polygon { coordinates } => validate_rings(coordinates),
            Geometry::MultiPolygon { coordinates } => {
                if coordinates.is_empty() {
                    return Err(BiomassError::InvalidGeometry(
                        "MultiPolygon has no polygons".to_string(),
                    ));
                }
                for polygon in coordinates {
                    validate_rings(polygon)?;
                }
                Ok(())
            }
        }
    }

    /// Iterate over every position in the geometry.
    fn positions(&self) -> Vec<[f64; 2]> {
        match self {
            Geometry::Point { coordinates } => vec![*coordinates],
            Geometry::Polygon { coordinates } => {
                coordinates.iter().flatten().copied().collect()
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .flatten()
                .flatten()
                .copied()
                .collect(),
        }
    }

    /// Axis-aligned bounding box as (min_lon, min_lat, max_lon, max_lat).
    ///
    /// Returns `None` for a geometry with no positions.
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        let positions = self.positions();
        let first = positions.first()?;
        let mut bbox = (first[0], first[1], first[0], first[1]);
        for [lon, lat] in positions {
            bbox.0 = bbox.0.min(lon);
            bbox.1 = bbox.1.min(lat);
            bbox.2 = bbox.2.max(lon);
            bbox.3 = bbox.3.max(lat);
        }
        Some(bbox)
    }
}

fn validate_rings(rings: &[Vec<[f64; 2]>]) -> BiomassResult<()> {
    if rings.is_empty() {
        return Err(BiomassError::InvalidGeometry(
            "Polygon has no rings".to_string(),
        ));
    }
    for ring in rings {
        if ring.len() < 4 {
            return Err(BiomassError::InvalidGeometry(format!(
                "Ring has {} positions, at least 4 required",
                ring.len()
            )));
        }
        for [lon, lat] in ring {
            if !lon.is_finite() || !lat.is_finite() {
                return Err(BiomassError::InvalidGeometry(
                    "Non-finite coordinate".to_string(),
                ));
            }
            if *lon < -180.0 || *lon > 180.0 || *lat < -90.0 || *lat > 90.0 {
                return Err(BiomassError::InvalidGeometry(format!(
                    "Coordinate out of range: [{}, {}]",
                    lon, lat
                )));
            }
        }
    }
    Ok(())
}
