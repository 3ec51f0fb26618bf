//! Period statistics over an assembled time series.

use std::collections::BTreeMap;

use biomass_common::index::VegetationIndex;
use biomass_common::series::{round4, PeriodStat, TimeSeries};

/// Descriptive statistics per requested index.
///
/// Every requested index gets an entry, even when it produced no samples
/// (all-`None` fields, count 0), so response shapes do not depend on how
/// cloudy the period was.
pub fn period_stats(
    series: &TimeSeries,
    indices: &[VegetationIndex],
) -> BTreeMap<VegetationIndex, PeriodStat> {
    indices
        .iter()
        .map(|&index| (index, describe(&series.values_for(index))))
        .collect()
}

/// Period summary: the mean per index, `None` where nothing was observed.
pub fn period_summary(
    stats: &BTreeMap<VegetationIndex, PeriodStat>,
) -> BTreeMap<VegetationIndex, Option<f64>> {
    stats.iter().map(|(&index, stat)| (index, stat.mean)).collect()
}

fn describe(samples: &[f64]) -> PeriodStat {
    if samples.is_empty() {
        return PeriodStat::default();
    }

    let count = samples.len();
    let mean = samples.iter().sum::<f64>() / count as f64;

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let std_dev = if count < 2 {
        0.0
    } else {
        let variance = samples
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (count - 1) as f64;
        variance.sqrt()
    };

    PeriodStat {
        mean: Some(round4(mean)),
        min: Some(round4(sorted[0])),
        max: Some(round4(sorted[count - 1])),
        std_dev: Some(round4(std_dev)),
        median: Some(round4(percentile(&sorted, 0.5))),
        p10: Some(round4(percentile(&sorted, 0.10))),
        p90: Some(round4(percentile(&sorted, 0.90))),
        count,
    }
}

/// Linear-interpolation percentile over an ascending slice: rank
/// `k = (n - 1) * p`, interpolated between the neighboring samples.
/// The slice must be non-empty.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let last = sorted.len() - 1;
    let rank = last as f64 * p;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(last);
    sorted[lower] + (rank - lower as f64) * (sorted[upper] - sorted[lower])
}
