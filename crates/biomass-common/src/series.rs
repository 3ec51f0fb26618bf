//! Time-series and period-statistics types.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::index::{SensorGroup, VegetationIndex};

/// Round a value to four decimal places, the precision every reported
/// index value and statistic carries.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Index values observed for one acquisition date on one sensor group.
///
/// A `DatePoint` always carries at least one value; dates whose reduction
/// produced nothing are dropped before assembly rather than emitted empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatePoint {
    pub date: NaiveDate,
    pub sensor: SensorGroup,
    pub values: BTreeMap<VegetationIndex, f64>,
}

impl DatePoint {
    pub fn value(&self, index: VegetationIndex) -> Option<f64> {
        self.values.get(&index).copied()
    }
}

/// An assembled time series, ordered ascending by date.
///
/// Two sensor groups observing the same calendar date stay two entries;
/// equal dates keep the order the orchestrator enqueued them in
/// (multispectral before thermal).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeries(pub Vec<DatePoint>);

impl TimeSeries {
    /// Assemble a series from `(sequence, point)` pairs collected in
    /// completion order. Sorting by `(date, sequence)` makes the result
    /// independent of the order tasks finished in.
    pub fn assemble(mut points: Vec<(usize, DatePoint)>) -> Self {
        points.sort_by(|a, b| (a.1.date, a.0).cmp(&(b.1.date, b.0)));
        TimeSeries(points.into_iter().map(|(_, p)| p).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DatePoint> {
        self.0.iter()
    }

    /// All observed values of one index, in series order.
    pub fn values_for(&self, index: VegetationIndex) -> Vec<f64> {
        self.0.iter().filter_map(|p| p.value(index)).collect()
    }

    /// Whether dates are non-decreasing front to back.
    pub fn is_sorted_by_date(&self) -> bool {
        self.0.windows(2).all(|w| w[0].date <= w[1].date)
    }
}

impl IntoIterator for TimeSeries {
    type Item = DatePoint;
    type IntoIter = std::vec::IntoIter<DatePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a DatePoint;
    type IntoIter = std::slice::Iter<'a, DatePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Period statistics for one index over the whole series.
///
/// Every field except `count` is absent when the index produced no
/// samples in the requested period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodStat {
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Sample standard deviation; 0 when fewer than 2 samples.
    pub std_dev: Option<f64>,
    pub median: Option<f64>,
    pub p10: Option<f64>,
    pub p90: Option<f64>,
    pub count: usize,
}
