//! Relational loader: maps a cleaned batch onto the short-term schema.
//!
//! Each table is loaded in its own transaction, committed independently of
//! the others; a failure partway through the sequence leaves the earlier
//! tables loaded and skips the rest. Every insert is conflict-tolerant
//! (`ON CONFLICT DO NOTHING` against the natural-key UNIQUE constraint)
//! and foreign keys are resolved by correlated natural-key subselects in
//! the same statement, so a parent inserted moments earlier in the run is
//! already visible. An unresolved parent yields a NULL foreign key, not a
//! load failure.

use std::collections::BTreeSet;

use serde::Serialize;
use sqlx::PgPool;

use crate::models::CleanedPlantRow;
use crate::Config;

// ---

/// Outcome of one table's load step.
#[derive(Debug, Clone, Serialize)]
pub struct TableLoad {
    // ---
    pub table: String,
    /// Rows offered to the insert (rows lacking the table's required
    /// fields are not offered).
    pub attempted: u64,
    /// Rows actually inserted; conflict-skipped rows are not counted.
    pub inserted: u64,
    pub error: Option<String>,
}

impl TableLoad {
    fn ok(table: &str, attempted: u64, inserted: u64) -> Self {
        // ---
        Self {
            table: table.to_string(),
            attempted,
            inserted,
            error: None,
        }
    }

    fn failed(table: &str, error: &sqlx::Error) -> Self {
        // ---
        Self {
            table: table.to_string(),
            attempted: 0,
            inserted: 0,
            error: Some(error.to_string()),
        }
    }
}

// ---

/// Load a cleaned batch into the short-term schema, dimension tables
/// before fact tables. Returns one [`TableLoad`] per executed step; a
/// failed step ends the sequence, and steps after it do not run.
pub async fn load_batch(pool: &PgPool, cfg: &Config, rows: &[CleanedPlantRow]) -> Vec<TableLoad> {
    // ---
    let schema = cfg.short_term_schema.as_str();
    let mut reports: Vec<TableLoad> = Vec::new();

    macro_rules! step {
        ($table:literal, $fut:expr) => {
            match $fut.await {
                Ok((attempted, inserted)) => {
                    tracing::debug!(
                        "Loaded {}: {} inserted of {} attempted",
                        $table,
                        inserted,
                        attempted
                    );
                    reports.push(TableLoad::ok($table, attempted, inserted));
                }
                Err(e) => {
                    tracing::error!("Failed to load {}: {}", $table, e);
                    reports.push(TableLoad::failed($table, &e));
                    return reports;
                }
            }
        };
    }

    step!("plant_origin", insert_origins(pool, schema, rows));
    step!("plant", insert_plants(pool, schema, rows));
    step!("botanist", insert_botanists(pool, schema, rows));
    step!(
        "sun_condition",
        insert_conditions(pool, schema, "sun_condition", rows.iter().map(|r| r.sun_condition.as_str()))
    );
    step!(
        "shade_condition",
        insert_conditions(pool, schema, "shade_condition", rows.iter().map(|r| r.shade_condition.as_str()))
    );
    step!("water_history", insert_water_history(pool, schema, rows));
    step!("reading_information", insert_readings(pool, schema, rows));

    reports
}

// ---

async fn insert_origins(
    pool: &PgPool,
    schema: &str,
    rows: &[CleanedPlantRow],
) -> Result<(u64, u64), sqlx::Error> {
    // ---
    let sql = format!(
        r#"
        INSERT INTO {schema}.plant_origin (latitude, longitude, country)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING;
        "#
    );

    let mut tx = pool.begin().await?;
    let mut attempted = 0;
    let mut inserted = 0;

    for row in rows {
        // A record with no location information has no origin row.
        if row.latitude.is_none() && row.longitude.is_none() && row.country.is_none() {
            continue;
        }
        attempted += 1;
        inserted += sqlx::query(&sql)
            .bind(row.latitude)
            .bind(row.longitude)
            .bind(&row.country)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    Ok((attempted, inserted))
}

async fn insert_plants(
    pool: &PgPool,
    schema: &str,
    rows: &[CleanedPlantRow],
) -> Result<(u64, u64), sqlx::Error> {
    // ---
    let sql = format!(
        r#"
        INSERT INTO {schema}.plant (plant_id, plant_name, plant_scientific_name, plant_origin_id)
        VALUES ($1, $2, $3,
            (SELECT plant_origin_id FROM {schema}.plant_origin
              WHERE latitude  IS NOT DISTINCT FROM $4
                AND longitude IS NOT DISTINCT FROM $5
                AND country   IS NOT DISTINCT FROM $6
              LIMIT 1))
        ON CONFLICT DO NOTHING;
        "#
    );

    let mut tx = pool.begin().await?;
    let mut attempted = 0;
    let mut inserted = 0;

    for row in rows {
        // The upstream id is the natural key; without it there is no
        // plant row to create.
        let Some(plant_id) = row.plant_id else { continue };
        attempted += 1;
        inserted += sqlx::query(&sql)
            .bind(plant_id)
            .bind(&row.plant_name)
            .bind(&row.scientific_name)
            .bind(row.latitude)
            .bind(row.longitude)
            .bind(&row.country)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    Ok((attempted, inserted))
}

async fn insert_botanists(
    pool: &PgPool,
    schema: &str,
    rows: &[CleanedPlantRow],
) -> Result<(u64, u64), sqlx::Error> {
    // ---
    let sql = format!(
        r#"
        INSERT INTO {schema}.botanist (botanist_name, botanist_email, botanist_phone_number)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING;
        "#
    );

    let mut tx = pool.begin().await?;
    let mut attempted = 0;
    let mut inserted = 0;

    for row in rows {
        let Some(name) = row.botanist_name.as_deref() else { continue };
        attempted += 1;
        inserted += sqlx::query(&sql)
            .bind(name)
            .bind(&row.botanist_email)
            .bind(&row.botanist_phone)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    Ok((attempted, inserted))
}

/// Seed a condition lookup table from the batch's distinct values.
async fn insert_conditions<'a>(
    pool: &PgPool,
    schema: &str,
    table: &str,
    values: impl Iterator<Item = &'a str>,
) -> Result<(u64, u64), sqlx::Error> {
    // ---
    let sql = format!(
        r#"
        INSERT INTO {schema}.{table} ({table}_type)
        VALUES ($1)
        ON CONFLICT DO NOTHING;
        "#
    );

    let distinct: BTreeSet<&str> = values.filter(|v| !v.is_empty()).collect();

    let mut tx = pool.begin().await?;
    let mut attempted = 0;
    let mut inserted = 0;

    for value in distinct {
        attempted += 1;
        inserted += sqlx::query(&sql)
            .bind(value)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    Ok((attempted, inserted))
}

async fn insert_water_history(
    pool: &PgPool,
    schema: &str,
    rows: &[CleanedPlantRow],
) -> Result<(u64, u64), sqlx::Error> {
    // ---
    let sql = format!(
        r#"
        INSERT INTO {schema}.water_history (time_watered, plant_id)
        VALUES ($1,
            (SELECT plant_id FROM {schema}.plant WHERE plant_id IS NOT DISTINCT FROM $2))
        ON CONFLICT DO NOTHING;
        "#
    );

    let mut tx = pool.begin().await?;
    let mut attempted = 0;
    let mut inserted = 0;

    for row in rows {
        let Some(time_watered) = row.last_watered else { continue };
        attempted += 1;
        inserted += sqlx::query(&sql)
            .bind(time_watered)
            .bind(row.plant_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    Ok((attempted, inserted))
}

async fn insert_readings(
    pool: &PgPool,
    schema: &str,
    rows: &[CleanedPlantRow],
) -> Result<(u64, u64), sqlx::Error> {
    // ---
    let sql = format!(
        r#"
        INSERT INTO {schema}.reading_information
            (plant_id, plant_reading_time, botanist_id,
             temperature, soil_moisture, sun_condition_id, shade_condition_id)
        VALUES (
            (SELECT plant_id FROM {schema}.plant WHERE plant_id IS NOT DISTINCT FROM $1),
            $2,
            (SELECT botanist_id FROM {schema}.botanist WHERE botanist_name IS NOT DISTINCT FROM $3),
            $4, $5,
            (SELECT sun_condition_id FROM {schema}.sun_condition WHERE sun_condition_type = $6),
            (SELECT shade_condition_id FROM {schema}.shade_condition WHERE shade_condition_type = $7))
        ON CONFLICT DO NOTHING;
        "#
    );

    let mut tx = pool.begin().await?;
    let mut attempted = 0;
    let mut inserted = 0;

    for row in rows {
        let Some(reading_time) = row.recording_time else { continue };
        attempted += 1;
        inserted += sqlx::query(&sql)
            .bind(row.plant_id)
            .bind(reading_time)
            .bind(&row.botanist_name)
            .bind(row.temperature)
            .bind(row.soil_moisture)
            .bind(&row.sun_condition)
            .bind(&row.shade_condition)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    Ok((attempted, inserted))
}
