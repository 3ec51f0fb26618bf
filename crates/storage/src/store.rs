//! Measurement store backed by PostgreSQL.

use biomass_common::error::{BiomassError, BiomassResult};
use biomass_common::series::TimeSeries;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use tracing::{info, instrument};

use crate::plan::{plan_upsert, RowUpdate, UpsertSummary};
use crate::record::MeasurementRecord;

/// Database connection pool and measurement operations.
pub struct MeasurementStore {
    pool: PgPool,
}

impl MeasurementStore {
    /// Create a new store connection from a database URL.
    pub async fn connect(database_url: &str) -> BiomassResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| BiomassError::Database(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> BiomassResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| BiomassError::Database(format!("Migration failed: {}", e)))?;
            }
        }

        Ok(())
    }

    /// Persist an assembled series for a field.
    ///
    /// Rows are keyed by `(field_id, date, sensor)`. Missing rows are
    /// inserted; present rows are touched only in columns whose value
    /// changed, inside one transaction. Replaying an unchanged analysis
    /// writes nothing.
    #[instrument(skip(self, series), fields(field = field_id))]
    pub async fn upsert_series(
        &self,
        field_id: &str,
        series: &TimeSeries,
    ) -> BiomassResult<UpsertSummary> {
        let existing = self.history(field_id).await?;
        let plan = plan_upsert(field_id, &existing, series);
        let summary = UpsertSummary {
            new_records: plan.inserts.len(),
            updated_records: plan.updates.len(),
        };
        if plan.is_empty() {
            info!("Series already persisted, nothing to write");
            return Ok(summary);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BiomassError::Database(format!("Transaction failed: {}", e)))?;
        for record in &plan.inserts {
            insert_record(&mut tx, record).await?;
        }
        for update in &plan.updates {
            apply_update(&mut tx, field_id, update).await?;
        }
        tx.commit()
            .await
            .map_err(|e| BiomassError::Database(format!("Commit failed: {}", e)))?;

        info!(
            new = summary.new_records,
            updated = summary.updated_records,
            "Persisted measurement series"
        );
        Ok(summary)
    }

    /// All stored measurements for a field, oldest first. Rows sharing a
    /// date come back multispectral first, matching series order.
    pub async fn history(&self, field_id: &str) -> BiomassResult<Vec<MeasurementRecord>> {
        let rows = sqlx::query_as::<_, MeasurementRecord>(
            "SELECT field_id, date, sensor, \
             ndvi, ndre, gndvi, evi, savi, cire, mtci, ireci, ndmi, nmdi, \
             lst, vswi, tvdi, tci, vhi \
             FROM field_measurements WHERE field_id = $1 \
             ORDER BY date ASC, CASE WHEN sensor = 'Sentinel-2' THEN 0 ELSE 1 END ASC",
        )
        .bind(field_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BiomassError::Database(format!("Query failed: {}", e)))?;

        Ok(rows)
    }
}

async fn insert_record(
    tx: &mut Transaction<'_, Postgres>,
    record: &MeasurementRecord,
) -> BiomassResult<()> {
    sqlx::query(
        r#"
        INSERT INTO field_measurements (
            field_id, date, sensor,
            ndvi, ndre, gndvi, evi, savi,
            cire, mtci, ireci, ndmi, nmdi,
            lst, vswi, tvdi, tci, vhi
        ) VALUES (
            $1, $2, $3,
            $4, $5, $6, $7, $8,
            $9, $10, $11, $12, $13,
            $14, $15, $16, $17, $18
        )
        ON CONFLICT (field_id, date, sensor)
        DO UPDATE SET
            ndvi = COALESCE(EXCLUDED.ndvi, field_measurements.ndvi),
            ndre = COALESCE(EXCLUDED.ndre, field_measurements.ndre),
            gndvi = COALESCE(EXCLUDED.gndvi, field_measurements.gndvi),
            evi = COALESCE(EXCLUDED.evi, field_measurements.evi),
            savi = COALESCE(EXCLUDED.savi, field_measurements.savi),
            cire = COALESCE(EXCLUDED.cire, field_measurements.cire),
            mtci = COALESCE(EXCLUDED.mtci, field_measurements.mtci),
            ireci = COALESCE(EXCLUDED.ireci, field_measurements.ireci),
            ndmi = COALESCE(EXCLUDED.ndmi, field_measurements.ndmi),
            nmdi = COALESCE(EXCLUDED.nmdi, field_measurements.nmdi),
            lst = COALESCE(EXCLUDED.lst, field_measurements.lst),
            vswi = COALESCE(EXCLUDED.vswi, field_measurements.vswi),
            tvdi = COALESCE(EXCLUDED.tvdi, field_measurements.tvdi),
            tci = COALESCE(EXCLUDED.tci, field_measurements.tci),
            vhi = COALESCE(EXCLUDED.vhi, field_measurements.vhi),
            updated_at = NOW()
        "#,
    )
    .bind(&record.field_id)
    .bind(record.date)
    .bind(&record.sensor)
    .bind(record.ndvi)
    .bind(record.ndre)
    .bind(record.gndvi)
    .bind(record.evi)
    .bind(record.savi)
    .bind(record.cire)
    .bind(record.mtci)
    .bind(record.ireci)
    .bind(record.ndmi)
    .bind(record.nmdi)
    .bind(record.lst)
    .bind(record.vswi)
    .bind(record.tvdi)
    .bind(record.tci)
    .bind(record.vhi)
    .execute(&mut **tx)
    .await
    .map_err(|e| BiomassError::Database(format!("Insert failed: {}", e)))?;

    Ok(())
}

/// Write only the changed columns of one existing row.
async fn apply_update(
    tx: &mut Transaction<'_, Postgres>,
    field_id: &str,
    update: &RowUpdate,
) -> BiomassResult<()> {
    let columns: Vec<(&'static str, f64)> = update
        .changes
        .iter()
        .filter_map(|&(index, value)| index.column_name().map(|c| (c, value)))
        .collect();
    if columns.is_empty() {
        return Ok(());
    }

    let mut sql = String::from("UPDATE field_measurements SET ");
    for (pos, (column, _)) in columns.iter().enumerate() {
        if pos > 0 {
            sql.push_str(", ");
        }
        sql.push_str(&format!("{} = ${}", column, pos + 1));
    }
    sql.push_str(", updated_at = NOW()");
    let next = columns.len() + 1;
    sql.push_str(&format!(
        " WHERE field_id = ${} AND date = ${} AND sensor = ${}",
        next,
        next + 1,
        next + 2
    ));

    let mut query = sqlx::query(&sql);
    for (_, value) in &columns {
        query = query.bind(*value);
    }
    query
        .bind(field_id)
        .bind(update.date)
        .bind(&update.sensor)
        .execute(&mut **tx)
        .await
        .map_err(|e| BiomassError::Database(format!("Update failed: {}", e)))?;

    Ok(())
}

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS field_measurements (
    id BIGSERIAL PRIMARY KEY,
    field_id VARCHAR(100) NOT NULL,
    date DATE NOT NULL,
    sensor VARCHAR(20) NOT NULL,
    ndvi DOUBLE PRECISION,
    ndre DOUBLE PRECISION,
    gndvi DOUBLE PRECISION,
    evi DOUBLE PRECISION,
    savi DOUBLE PRECISION,
    cire DOUBLE PRECISION,
    mtci DOUBLE PRECISION,
    ireci DOUBLE PRECISION,
    ndmi DOUBLE PRECISION,
    nmdi DOUBLE PRECISION,
    lst DOUBLE PRECISION,
    vswi DOUBLE PRECISION,
    tvdi DOUBLE PRECISION,
    tci DOUBLE PRECISION,
    vhi DOUBLE PRECISION,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    UNIQUE(field_id, date, sensor)
);

CREATE INDEX IF NOT EXISTS idx_measurements_field ON field_measurements(field_id);
CREATE INDEX IF NOT EXISTS idx_measurements_field_date ON field_measurements(field_id, date)
"#;
