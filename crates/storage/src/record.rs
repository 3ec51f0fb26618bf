//! Persisted measurement rows.

use biomass_common::index::VegetationIndex;
use biomass_common::series::DatePoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One stored measurement: the index values observed for a field on one
/// date from one sensor group. Indices the analysis did not request or
/// could not compute stay `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MeasurementRecord {
    pub field_id: String,
    pub date: NaiveDate,
    /// Short sensor label, `Sentinel-2` or `Landsat 8/9`.
    pub sensor: String,
    pub ndvi: Option<f64>,
    pub ndre: Option<f64>,
    pub gndvi: Option<f64>,
    pub evi: Option<f64>,
    pub savi: Option<f64>,
    pub cire: Option<f64>,
    pub mtci: Option<f64>,
    pub ireci: Option<f64>,
    pub ndmi: Option<f64>,
    pub nmdi: Option<f64>,
    pub lst: Option<f64>,
    pub vswi: Option<f64>,
    pub tvdi: Option<f64>,
    pub tci: Option<f64>,
    pub vhi: Option<f64>,
}

impl MeasurementRecord {
    /// A row for one series point, with every observed value filled in.
    pub fn from_point(field_id: &str, point: &DatePoint) -> Self {
        let mut record = MeasurementRecord {
            field_id: field_id.to_string(),
            date: point.date,
            sensor: point.sensor.label().to_string(),
            ..Default::default()
        };
        for (&index, &value) in &point.values {
            record.set(index, value);
        }
        record
    }

    /// Stored value of one index column.
    pub fn value(&self, index: VegetationIndex) -> Option<f64> {
        match index {
            VegetationIndex::Ndvi => self.ndvi,
            VegetationIndex::Ndre => self.ndre,
            VegetationIndex::Gndvi => self.gndvi,
            VegetationIndex::Evi => self.evi,
            VegetationIndex::Savi => self.savi,
            VegetationIndex::Cire => self.cire,
            VegetationIndex::Mtci => self.mtci,
            VegetationIndex::Ireci => self.ireci,
            VegetationIndex::Ndmi => self.ndmi,
            VegetationIndex::Nmdi => self.nmdi,
            VegetationIndex::Lst => self.lst,
            VegetationIndex::Vswi => self.vswi,
            VegetationIndex::Tvdi => self.tvdi,
            VegetationIndex::Tci => self.tci,
            VegetationIndex::Vhi => self.vhi,
            VegetationIndex::TrueColor => None,
        }
    }

    /// Set one index column. True-color has no column and is ignored.
    pub fn set(&mut self, index: VegetationIndex, value: f64) {
        let slot = match index {
            VegetationIndex::Ndvi => &mut self.ndvi,
            VegetationIndex::Ndre => &mut self.ndre,
            VegetationIndex::Gndvi => &mut self.gndvi,
            VegetationIndex::Evi => &mut self.evi,
            VegetationIndex::Savi => &mut self.savi,
            VegetationIndex::Cire => &mut self.cire,
            VegetationIndex::Mtci => &mut self.mtci,
            VegetationIndex::Ireci => &mut self.ireci,
            VegetationIndex::Ndmi => &mut self.ndmi,
            VegetationIndex::Nmdi => &mut self.nmdi,
            VegetationIndex::Lst => &mut self.lst,
            VegetationIndex::Vswi => &mut self.vswi,
            VegetationIndex::Tvdi => &mut self.tvdi,
            VegetationIndex::Tci => &mut self.tci,
            VegetationIndex::Vhi => &mut self.vhi,
            VegetationIndex::TrueColor => return,
        };
        *slot = Some(value);
    }
}
