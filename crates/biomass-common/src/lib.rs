//! Shared types for the field biomass analysis services.
//!
//! This crate holds everything the service boundary and the pipeline agree
//! on: the error taxonomy, GeoJSON geometry for areas of interest, the
//! spectral index registry, time-series and period-statistics types, and
//! request validation.

pub mod error;
pub mod geometry;
pub mod index;
pub mod request;
pub mod series;

pub use error::{BiomassError, BiomassResult};
pub use geometry::Geometry;
pub use index::{SensorGroup, VegetationIndex, VisSpec};
pub use request::{
    AnalysisRequest, BatchTileRequest, PixelRequest, ValidatedBatchRequest, ValidatedPixelRequest,
    ValidatedRequest, DEFAULT_CLOUD_COVER,
};
pub use series::{round4, DatePoint, PeriodStat, TimeSeries};
