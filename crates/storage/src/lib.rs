//! Measurement persistence for biomass analyses.
//!
//! Analyses write their assembled time series to a PostgreSQL table keyed
//! by `(field_id, date, sensor)`. Writes are planned against what is
//! already stored so a replayed analysis writes nothing, and the history
//! endpoint reads rows back in series order.

pub mod plan;
pub mod record;
pub mod store;

pub use plan::{plan_upsert, RowUpdate, UpsertPlan, UpsertSummary};
pub use record::MeasurementRecord;
pub use store::MeasurementStore;
