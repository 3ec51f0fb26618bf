//! Per-date index computation.
//!
//! One acquisition date on one sensor group is one unit of work: build the
//! masked one-day mosaic, stack the requested index bands together with the
//! clear-ratio band, and reduce everything over the AOI in a single remote
//! call. The clear ratio then decides whether the date is reported.

use std::collections::BTreeMap;

use biomass_common::geometry::Geometry;
use biomass_common::index::{SensorGroup, VegetationIndex};
use biomass_common::series::{round4, DatePoint};
use chrono::{Duration, NaiveDate};
use ee_client::expr::{CompositeMode, ImageExpr};
use ee_client::reduce::RegionReduction;
use ee_client::{EeError, ImageryService};

use crate::catalog::MosaicContext;
use crate::gate;

/// Why a date produced no time-series entry.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// The AOI clear ratio fell below [`gate::MIN_CLEAR_RATIO`]. A missing
    /// ratio (no unmasked reference pixels at all) reports as 0.
    CloudCover { clear_ratio: f64 },
    /// The reduction returned no value for any requested index.
    NoValues,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::CloudCover { clear_ratio } => {
                write!(f, "clear ratio {:.3} below {}", clear_ratio, gate::MIN_CLEAR_RATIO)
            }
            RejectReason::NoValues => f.write_str("no index values in reduction"),
        }
    }
}

/// Result of processing one (date, sensor group) task.
///
/// Rejections and failures both drop the date from the series; they are
/// kept apart so the orchestrator can log quality gating and remote
/// failures differently.
#[derive(Debug)]
pub enum DateOutcome {
    Computed(DatePoint),
    Rejected(RejectReason),
    Failed(EeError),
}

/// Compute the requested indices for one date on one sensor group.
///
/// Exactly one remote reduction is issued; the clear-ratio band rides
/// along with the index bands. Remote failures are captured in the outcome
/// rather than propagated, so one bad date cannot take down the fan-out.
pub async fn process_date(
    imagery: &dyn ImageryService,
    group: SensorGroup,
    date: NaiveDate,
    indices: &[VegetationIndex],
    aoi: &Geometry,
    cloud_cover: u8,
) -> DateOutcome {
    let query = gate::scene_query(group, aoi, date, date + Duration::days(1), cloud_cover);
    let mosaic = gate::masked_composite(group, query, CompositeMode::Mosaic);
    let context = MosaicContext::new(group, &mosaic, aoi);

    let mut bands: Vec<ImageExpr> = indices
        .iter()
        .filter_map(|&index| context.index_band(index))
        .collect();
    bands.push(gate::clear_ratio_band(group, &mosaic));
    let stacked = ImageExpr::cat(bands);

    let reduction = RegionReduction::mean(aoi.clone(), group.gsd());
    let values = match imagery.reduce_region(&stacked, &reduction).await {
        Ok(values) => values,
        Err(err) => return DateOutcome::Failed(err),
    };

    let clear_ratio = values.get(gate::CLEAR_RATIO_BAND).unwrap_or(0.0);
    if !gate::meets_clear_ratio(clear_ratio) {
        return DateOutcome::Rejected(RejectReason::CloudCover { clear_ratio });
    }

    let mut observed = BTreeMap::new();
    for &index in indices {
        if let Some(value) = values.get(index.name()) {
            observed.insert(index, round4(value));
        }
    }
    if observed.is_empty() {
        return DateOutcome::Rejected(RejectReason::NoValues);
    }

    DateOutcome::Computed(DatePoint {
        date,
        sensor: group,
        values: observed,
    })
}
