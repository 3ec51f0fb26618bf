//! Analysis orchestration.
//!
//! The pipeline validates the request, discovers acquisition dates per
//! sensor group, fans per-date computations out over a bounded-concurrency
//! stream, and merges completions back into a deterministic result. Tasks
//! are tagged with their enqueue sequence so the assembled series is
//! independent of completion order; a single merge pass then folds the
//! outcomes, logging rejected and failed dates instead of failing the run.

use std::collections::BTreeMap;
use std::sync::Arc;

use biomass_common::error::BiomassResult;
use biomass_common::index::{partition_by_sensor, SensorGroup, VegetationIndex};
use biomass_common::request::{AnalysisRequest, ValidatedRequest};
use biomass_common::series::{PeriodStat, TimeSeries};
use chrono::NaiveDate;
use ee_client::ImageryService;
use futures::{stream, StreamExt};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::processor::{self, DateOutcome};
use crate::{discovery, stats};

/// Default bound on concurrently processed dates.
pub const DEFAULT_MAX_CONCURRENT: usize = 6;

/// Tuning knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Maximum number of per-date computations in flight at once.
    /// Floored at 1 when the pipeline runs.
    pub max_concurrent: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// Request echo carried in analysis responses.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    pub field_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Long labels of the sensor groups that contributed, multispectral
    /// first.
    pub sensor_labels: Vec<String>,
}

/// Everything a completed analysis reports.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub metadata: AnalysisMetadata,
    /// Period mean per requested index; `null` where nothing was observed.
    pub period_summary: BTreeMap<VegetationIndex, Option<f64>>,
    pub period_stats: BTreeMap<VegetationIndex, PeriodStat>,
    pub timeseries: TimeSeries,
}

/// The analysis pipeline: discovery, bounded fan-out, merge, statistics.
pub struct AnalysisPipeline {
    imagery: Arc<dyn ImageryService>,
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    pub fn new(imagery: Arc<dyn ImageryService>, config: AnalysisConfig) -> Self {
        Self { imagery, config }
    }

    /// Run a full analysis for one request.
    ///
    /// Validation failures surface before any remote call. Discovery
    /// failures abort the run; per-date failures and quality rejections
    /// only drop their date.
    #[instrument(skip(self, request), fields(field = %request.field_id))]
    pub async fn run(&self, request: &AnalysisRequest) -> BiomassResult<AnalysisOutcome> {
        let validated = request.validate_for_analysis()?;
        self.run_validated(&validated).await
    }

    async fn run_validated(&self, request: &ValidatedRequest) -> BiomassResult<AnalysisOutcome> {
        let run_id = Uuid::new_v4();
        let (multispectral_indices, thermal_indices) = partition_by_sensor(&request.indices);

        let discovered = discovery::discover_dates(
            self.imagery.as_ref(),
            &request.aoi,
            request.start,
            request.end,
            request.cloud_cover,
            !multispectral_indices.is_empty(),
            !thermal_indices.is_empty(),
        )
        .await?;
        info!(
            run = %run_id,
            multispectral = discovered.multispectral.len(),
            thermal = discovered.thermal.len(),
            "Starting per-date analysis"
        );

        // Enqueue multispectral dates first; the sequence breaks same-date
        // ties during assembly.
        let mut tasks: Vec<(SensorGroup, NaiveDate, Arc<Vec<VegetationIndex>>)> = Vec::new();
        let multispectral_indices = Arc::new(multispectral_indices);
        let thermal_indices = Arc::new(thermal_indices);
        for &date in &discovered.multispectral {
            tasks.push((SensorGroup::Multispectral, date, multispectral_indices.clone()));
        }
        for &date in &discovered.thermal {
            tasks.push((SensorGroup::Thermal, date, thermal_indices.clone()));
        }

        // A bound of zero would never poll a task.
        let parallel = self.config.max_concurrent.max(1);
        let outcomes = stream::iter(tasks.into_iter().enumerate())
            .map(|(seq, (group, date, indices))| {
                let imagery = self.imagery.clone();
                let aoi = request.aoi.clone();
                let cloud_cover = request.cloud_cover;
                async move {
                    let outcome = processor::process_date(
                        imagery.as_ref(),
                        group,
                        date,
                        &indices,
                        &aoi,
                        cloud_cover,
                    )
                    .await;
                    (seq, group, date, outcome)
                }
            })
            .buffer_unordered(parallel)
            .collect::<Vec<_>>()
            .await;

        // Single-consumer merge: completions arrive in any order and are
        // folded here alone, so no outcome can interleave mid-assembly.
        let mut points = Vec::new();
        let mut rejected = 0usize;
        let mut failed = 0usize;
        for (seq, group, date, outcome) in outcomes {
            match outcome {
                DateOutcome::Computed(point) => points.push((seq, point)),
                DateOutcome::Rejected(reason) => {
                    rejected += 1;
                    debug!(run = %run_id, sensor = %group, %date, %reason, "Date dropped by quality gate");
                }
                DateOutcome::Failed(err) => {
                    failed += 1;
                    warn!(run = %run_id, sensor = %group, %date, error = %err, "Date computation failed");
                }
            }
        }

        let timeseries = TimeSeries::assemble(points);
        let period_stats = stats::period_stats(&timeseries, &request.indices);
        let period_summary = stats::period_summary(&period_stats);

        let mut sensor_labels = Vec::new();
        if !multispectral_indices.is_empty() {
            sensor_labels.push(SensorGroup::Multispectral.long_label().to_string());
        }
        if !thermal_indices.is_empty() {
            sensor_labels.push(SensorGroup::Thermal.long_label().to_string());
        }

        info!(
            run = %run_id,
            points = timeseries.len(),
            rejected,
            failed,
            "Analysis complete"
        );

        Ok(AnalysisOutcome {
            metadata: AnalysisMetadata {
                field_id: request.field_id.clone(),
                start_date: request.start,
                end_date: request.end,
                sensor_labels,
            },
            period_summary,
            period_stats,
            timeseries,
        })
    }
}
