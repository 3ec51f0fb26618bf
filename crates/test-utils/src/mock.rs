//! Scripted imagery service for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use biomass_common::index::SensorGroup;
use chrono::NaiveDate;
use ee_client::expr::ImageExpr;
use ee_client::query::SceneQuery;
use ee_client::reduce::{BandValues, RegionReduction};
use ee_client::vis::VisParams;
use ee_client::{EeError, ImageryService};

/// In-memory [`ImageryService`] with scripted scenes, delays and failures.
///
/// Scripting happens through the builder methods before the mock is shared;
/// afterwards only call counters mutate, so the mock can sit behind an
/// `Arc` exactly like the real client. Per-scene delays let tests force
/// arbitrary completion orders, and the in-flight peak lets them observe
/// the concurrency bound from the outside.
#[derive(Default)]
pub struct MockImagery {
    multispectral_dates: Vec<NaiveDate>,
    thermal_dates: Vec<NaiveDate>,
    values: HashMap<(SensorGroup, NaiveDate), BandValues>,
    delays: HashMap<(SensorGroup, NaiveDate), Duration>,
    reduce_failures: HashSet<(SensorGroup, NaiveDate)>,
    scene_counts: HashMap<SensorGroup, u64>,
    fail_listing: bool,
    tile_delays: HashMap<String, Duration>,
    tile_failures: HashSet<String>,

    list_calls: AtomicUsize,
    reduce_calls: AtomicUsize,
    tile_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockImagery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script one scene: the date becomes discoverable for the group and
    /// its reduction returns `values`.
    pub fn with_scene(mut self, group: SensorGroup, date: &str, values: BandValues) -> Self {
        let date = parse_date(date);
        let dates = match group {
            SensorGroup::Multispectral => &mut self.multispectral_dates,
            SensorGroup::Thermal => &mut self.thermal_dates,
        };
        if !dates.contains(&date) {
            dates.push(date);
        }
        self.values.insert((group, date), values);
        self
    }

    /// Delay the reduction for one scene by `millis`.
    pub fn with_delay(mut self, group: SensorGroup, date: &str, millis: u64) -> Self {
        self.delays
            .insert((group, parse_date(date)), Duration::from_millis(millis));
        self
    }

    /// Make the reduction for one scene fail with a remote error.
    pub fn with_reduce_failure(mut self, group: SensorGroup, date: &str) -> Self {
        self.reduce_failures.insert((group, parse_date(date)));
        self
    }

    /// Make every date listing fail with a remote error.
    pub fn with_listing_failure(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Override the scene count reported for a group. Without an override
    /// the count is the number of scripted dates inside the queried window.
    pub fn with_scene_count(mut self, group: SensorGroup, count: u64) -> Self {
        self.scene_counts.insert(group, count);
        self
    }

    /// Delay tile resolution for the layer named `layer` by `millis`.
    pub fn with_tile_delay(mut self, layer: &str, millis: u64) -> Self {
        self.tile_delays
            .insert(layer.to_string(), Duration::from_millis(millis));
        self
    }

    /// Make tile resolution fail for the layer named `layer`.
    pub fn with_tile_failure(mut self, layer: &str) -> Self {
        self.tile_failures.insert(layer.to_string());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn reduce_calls(&self) -> usize {
        self.reduce_calls.load(Ordering::SeqCst)
    }

    pub fn tile_calls(&self) -> usize {
        self.tile_calls.load(Ordering::SeqCst)
    }

    /// Highest number of reductions that were in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn dates_for(&self, group: SensorGroup) -> &[NaiveDate] {
        match group {
            SensorGroup::Multispectral => &self.multispectral_dates,
            SensorGroup::Thermal => &self.thermal_dates,
        }
    }
}

fn parse_date(s: &str) -> NaiveDate {
    s.parse().unwrap_or_else(|_| panic!("bad test date: {}", s))
}

/// Sensor group a query belongs to, judged by its first collection id.
fn query_group(query: &SceneQuery) -> SensorGroup {
    let first = query.collections.first().map(String::as_str).unwrap_or("");
    if first.contains("COPERNICUS") {
        SensorGroup::Multispectral
    } else {
        SensorGroup::Thermal
    }
}

/// Name of the layer an expression renders: the first renamed band, or
/// `RGB` for a bare band-triple selection.
fn layer_label(expr: &ImageExpr) -> String {
    fn first_rename(expr: &ImageExpr) -> Option<String> {
        match expr {
            ImageExpr::Rename { name, .. } => Some(name.clone()),
            ImageExpr::Scene | ImageExpr::Constant { .. } | ImageExpr::Composite { .. } => None,
            ImageExpr::Select { source, .. }
            | ImageExpr::SelectBands { source, .. }
            | ImageExpr::BitAnd { source, .. }
            | ImageExpr::NormalizedDifference { source, .. }
            | ImageExpr::ScaleBands { source, .. }
            | ImageExpr::Mask { source }
            | ImageExpr::Clip { source, .. }
            | ImageExpr::RegionStat { source, .. } => first_rename(source),
            ImageExpr::Arith { lhs, rhs, .. } | ImageExpr::Compare { lhs, rhs, .. } => {
                first_rename(lhs).or_else(|| first_rename(rhs))
            }
            ImageExpr::UpdateMask { source, mask } => {
                first_rename(source).or_else(|| first_rename(mask))
            }
            ImageExpr::Cat { sources } => sources.iter().find_map(first_rename),
        }
    }

    fn has_band_triple(expr: &ImageExpr) -> bool {
        match expr {
            ImageExpr::SelectBands { bands, .. } => bands.len() == 3,
            ImageExpr::Clip { source, .. } => has_band_triple(source),
            _ => false,
        }
    }

    if let Some(name) = first_rename(expr) {
        name
    } else if has_band_triple(expr) {
        "RGB".to_string()
    } else {
        "layer".to_string()
    }
}

#[async_trait]
impl ImageryService for MockImagery {
    async fn list_dates(&self, query: &SceneQuery) -> Result<Vec<NaiveDate>, EeError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(EeError::Remote("scripted listing failure".to_string()));
        }
        let group = query_group(query);
        Ok(self
            .dates_for(group)
            .iter()
            .copied()
            .filter(|d| *d >= query.start && *d < query.end)
            .collect())
    }

    async fn count_scenes(&self, query: &SceneQuery) -> Result<u64, EeError> {
        let group = query_group(query);
        if let Some(count) = self.scene_counts.get(&group) {
            return Ok(*count);
        }
        let in_window = self
            .dates_for(group)
            .iter()
            .filter(|d| **d >= query.start && **d < query.end)
            .count();
        Ok(in_window as u64)
    }

    async fn reduce_region(
        &self,
        image: &ImageExpr,
        _reduction: &RegionReduction,
    ) -> Result<BandValues, EeError> {
        self.reduce_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let key = match image.scene_query() {
            Some(query) => (query_group(query), query.start),
            None => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return Err(EeError::Expression(
                    "expression has no scene query".to_string(),
                ));
            }
        };

        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.reduce_failures.contains(&key) {
            return Err(EeError::Remote(format!(
                "scripted reduction failure for {}",
                key.1
            )));
        }
        Ok(self.values.get(&key).cloned().unwrap_or_default())
    }

    async fn tile_url(&self, image: &ImageExpr, _vis: &VisParams) -> Result<String, EeError> {
        self.tile_calls.fetch_add(1, Ordering::SeqCst);
        let label = layer_label(image);
        if let Some(delay) = self.tile_delays.get(&label) {
            tokio::time::sleep(*delay).await;
        }
        if self.tile_failures.contains(&label) {
            return Err(EeError::Remote(format!(
                "scripted tile failure for {}",
                label
            )));
        }
        Ok(format!("https://tiles.test/{}/{{z}}/{{x}}/{{y}}", label))
    }
}
