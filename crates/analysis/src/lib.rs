//! Field biomass analysis pipeline.
//!
//! Turns an analysis request into a per-field time series of vegetation and
//! thermal indices. The pipeline discovers acquisition dates per sensor
//! group, fans per-date computations out with bounded concurrency, gates
//! each date on AOI cloud contamination, and assembles the surviving points
//! into a deterministic, date-ordered series with period statistics.
//!
//! Module map:
//! - [`gate`]: scene queries, per-scene cloud masks, the clear-ratio gate
//! - [`catalog`]: index band expressions over a masked composite
//! - [`discovery`]: per-group acquisition date listing
//! - [`processor`]: one date, one sensor group, one remote reduction
//! - [`orchestrator`]: fan-out, merge, statistics, the public entry point
//! - [`stats`]: period summary and descriptive statistics
//! - [`tiles`]: visualization tile layers (single and batch)
//! - [`pixel`]: point sampling for map tooltips

pub mod catalog;
pub mod discovery;
pub mod gate;
pub mod orchestrator;
pub mod pixel;
pub mod processor;
pub mod stats;
pub mod tiles;

pub use orchestrator::{AnalysisConfig, AnalysisOutcome, AnalysisPipeline};
pub use pixel::{sample_pixel, PixelSample};
pub use processor::{DateOutcome, RejectReason};
pub use tiles::{BatchTileResult, TileLayer, TileService};

use biomass_common::error::BiomassError;
use ee_client::EeError;

/// Map a client-side imagery failure into the service error taxonomy.
pub(crate) fn imagery_error(err: EeError) -> BiomassError {
    BiomassError::Imagery(err.to_string())
}
