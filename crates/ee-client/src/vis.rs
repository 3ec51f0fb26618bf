//! Visualization parameters for tile layers.

use serde::{Deserialize, Serialize};

/// How a single- or three-band image is stretched to RGB tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    pub min: f64,
    pub max: f64,
    /// Color ramp for single-band layers, low to high.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub palette: Vec<String>,
    /// Band triple for true-color layers.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bands: Option<Vec<String>>,
}

impl VisParams {
    /// Single-band color ramp between `min` and `max`.
    pub fn ramp(min: f64, max: f64, palette: &[&str]) -> Self {
        Self {
            min,
            max,
            palette: palette.iter().map(|c| c.to_string()).collect(),
            bands: None,
        }
    }

    /// Three-band composite stretched between `min` and `max`.
    pub fn rgb(bands: &[&str], min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            palette: Vec::new(),
            bands: Some(bands.iter().map(|b| b.to_string()).collect()),
        }
    }
}
