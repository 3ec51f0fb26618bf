//! Acquisition-date discovery.
//!
//! One listing per active sensor group, issued concurrently. Discovery is
//! the only remote step whose failure aborts the whole analysis: without a
//! date list there is nothing to fan out, so the error propagates instead
//! of degrading the result.

use biomass_common::error::BiomassResult;
use biomass_common::geometry::Geometry;
use biomass_common::index::SensorGroup;
use chrono::NaiveDate;
use ee_client::ImageryService;
use tracing::debug;

use crate::{gate, imagery_error};

/// Dates with at least one usable scene, per sensor group. Groups that were
/// not requested stay empty.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DiscoveredDates {
    pub multispectral: Vec<NaiveDate>,
    pub thermal: Vec<NaiveDate>,
}

impl DiscoveredDates {
    pub fn total(&self) -> usize {
        self.multispectral.len() + self.thermal.len()
    }
}

/// List acquisition dates for the requested sensor groups over the period.
///
/// An empty result is not an error; the caller reports an empty series.
pub async fn discover_dates(
    imagery: &dyn ImageryService,
    aoi: &Geometry,
    start: NaiveDate,
    end: NaiveDate,
    cloud_cover: u8,
    multispectral: bool,
    thermal: bool,
) -> BiomassResult<DiscoveredDates> {
    let list = |group: SensorGroup, active: bool| async move {
        if !active {
            return Ok(Vec::new());
        }
        let query = gate::scene_query(group, aoi, start, end, cloud_cover);
        imagery.list_dates(&query).await
    };

    let (multispectral, thermal) = tokio::join!(
        list(SensorGroup::Multispectral, multispectral),
        list(SensorGroup::Thermal, thermal),
    );

    let discovered = DiscoveredDates {
        multispectral: multispectral.map_err(imagery_error)?,
        thermal: thermal.map_err(imagery_error)?,
    };
    debug!(
        multispectral = discovered.multispectral.len(),
        thermal = discovered.thermal.len(),
        "Discovered acquisition dates"
    );
    Ok(discovered)
}
