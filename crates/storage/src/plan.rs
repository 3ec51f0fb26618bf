//! Upsert planning.
//!
//! An assembled series is diffed against the rows already stored for the
//! field before anything is written. Points without a stored row become
//! inserts; points whose row exists contribute only the columns whose
//! value actually differs. Replaying an unchanged analysis therefore
//! produces an empty plan.

use std::collections::HashMap;

use biomass_common::index::VegetationIndex;
use biomass_common::series::TimeSeries;
use chrono::NaiveDate;
use serde::Serialize;

use crate::record::MeasurementRecord;

/// Column changes for one existing row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
    pub date: NaiveDate,
    pub sensor: String,
    /// Columns to write, in series value order.
    pub changes: Vec<(VegetationIndex, f64)>,
}

/// Everything an upsert has to write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertPlan {
    pub inserts: Vec<MeasurementRecord>,
    pub updates: Vec<RowUpdate>,
}

impl UpsertPlan {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }
}

/// Row counts reported after an upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UpsertSummary {
    pub new_records: usize,
    pub updated_records: usize,
}

/// Plan the writes for persisting `series` against the rows already
/// stored for the field.
///
/// Stored and computed values both carry four decimals, so plain equality
/// detects change.
pub fn plan_upsert(
    field_id: &str,
    existing: &[MeasurementRecord],
    series: &TimeSeries,
) -> UpsertPlan {
    let stored: HashMap<(NaiveDate, &str), &MeasurementRecord> = existing
        .iter()
        .map(|r| ((r.date, r.sensor.as_str()), r))
        .collect();

    let mut plan = UpsertPlan::default();
    for point in series {
        let sensor = point.sensor.label();
        match stored.get(&(point.date, sensor)) {
            None => plan
                .inserts
                .push(MeasurementRecord::from_point(field_id, point)),
            Some(row) => {
                let mut changes = Vec::new();
                for (&index, &value) in &point.values {
                    if row.value(index) != Some(value) {
                        changes.push((index, value));
                    }
                }
                if !changes.is_empty() {
                    plan.updates.push(RowUpdate {
                        date: point.date,
                        sensor: sensor.to_string(),
                        changes,
                    });
                }
            }
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use biomass_common::index::SensorGroup;
    use biomass_common::series::DatePoint;

    fn point(date: &str, sensor: SensorGroup, values: &[(VegetationIndex, f64)]) -> DatePoint {
        DatePoint {
            date: date.parse().unwrap(),
            sensor,
            values: values.iter().copied().collect(),
        }
    }

    fn series(points: Vec<DatePoint>) -> TimeSeries {
        TimeSeries(points)
    }

    #[test]
    fn test_fresh_field_inserts_every_point() {
        let s = series(vec![
            point("2024-05-03", SensorGroup::Multispectral, &[(VegetationIndex::Ndvi, 0.5)]),
            point("2024-05-08", SensorGroup::Thermal, &[(VegetationIndex::Lst, 24.5)]),
        ]);

        let plan = plan_upsert("f", &[], &s);

        assert_eq!(plan.inserts.len(), 2);
        assert!(plan.updates.is_empty());
        assert_eq!(plan.inserts[0].sensor, "Sentinel-2");
        assert_eq!(plan.inserts[1].lst, Some(24.5));
    }

    #[test]
    fn test_replay_produces_empty_plan() {
        let s = series(vec![
            point("2024-05-03", SensorGroup::Multispectral, &[(VegetationIndex::Ndvi, 0.5)]),
            point("2024-05-08", SensorGroup::Thermal, &[(VegetationIndex::Lst, 24.5)]),
        ]);
        let first = plan_upsert("f", &[], &s);

        // Everything the first run inserted is now stored.
        let second = plan_upsert("f", &first.inserts, &s);
        assert!(second.is_empty());
    }

    #[test]
    fn test_changed_value_updates_only_that_column() {
        let stored = vec![MeasurementRecord::from_point(
            "f",
            &point(
                "2024-05-03",
                SensorGroup::Multispectral,
                &[(VegetationIndex::Ndvi, 0.5), (VegetationIndex::Evi, 0.3)],
            ),
        )];
        let s = series(vec![point(
            "2024-05-03",
            SensorGroup::Multispectral,
            &[(VegetationIndex::Ndvi, 0.52), (VegetationIndex::Evi, 0.3)],
        )]);

        let plan = plan_upsert("f", &stored, &s);

        assert!(plan.inserts.is_empty());
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].changes, vec![(VegetationIndex::Ndvi, 0.52)]);
    }

    #[test]
    fn test_newly_observed_index_fills_null_column() {
        let stored = vec![MeasurementRecord::from_point(
            "f",
            &point("2024-05-03", SensorGroup::Multispectral, &[(VegetationIndex::Ndvi, 0.5)]),
        )];
        // A later request adds EVI over the same dates.
        let s = series(vec![point(
            "2024-05-03",
            SensorGroup::Multispectral,
            &[(VegetationIndex::Ndvi, 0.5), (VegetationIndex::Evi, 0.3)],
        )]);

        let plan = plan_upsert("f", &stored, &s);

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].changes, vec![(VegetationIndex::Evi, 0.3)]);
    }

    #[test]
    fn test_sensor_groups_keep_distinct_rows_on_one_date() {
        let stored = vec![MeasurementRecord::from_point(
            "f",
            &point("2024-05-03", SensorGroup::Multispectral, &[(VegetationIndex::Ndvi, 0.5)]),
        )];
        let s = series(vec![
            point("2024-05-03", SensorGroup::Multispectral, &[(VegetationIndex::Ndvi, 0.5)]),
            point("2024-05-03", SensorGroup::Thermal, &[(VegetationIndex::Lst, 24.5)]),
        ]);

        let plan = plan_upsert("f", &stored, &s);

        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].sensor, "Landsat 8/9");
        assert!(plan.updates.is_empty());
    }

    #[test]
    fn test_empty_series_plans_nothing() {
        let stored = vec![MeasurementRecord::from_point(
            "f",
            &point("2024-05-03", SensorGroup::Multispectral, &[(VegetationIndex::Ndvi, 0.5)]),
        )];
        assert!(plan_upsert("f", &stored, &series(vec![])).is_empty());
    }
}
