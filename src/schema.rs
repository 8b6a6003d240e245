//! Database schema management for `plantflow`.
//!
//! Ensures the short-term and long-term schemas exist with identical table
//! shapes before serving requests. Applied once on startup from `main.rs`.
//! All natural keys are enforced as UNIQUE constraints here; the loader's
//! conflict-tolerant inserts rely on them.

use anyhow::Result;
use sqlx::PgPool;

use crate::Config;

// ---

/// Create or update the database schemas (idempotent).
///
/// Builds the seven pipeline tables in both the short-term and long-term
/// schema. Safe to call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool, cfg: &Config) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    for schema in [&cfg.short_term_schema, &cfg.long_term_schema] {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {schema};"))
            .execute(&mut *tx)
            .await?;

        for statement in table_statements(schema) {
            sqlx::query(&statement).execute(&mut *tx).await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

/// DDL for one schema's tables, dimension tables first.
fn table_statements(schema: &str) -> Vec<String> {
    // ---
    vec![
        // Shared location dimension; natural key is the coordinate triple.
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {schema}.plant_origin (
                plant_origin_id SERIAL PRIMARY KEY,
                latitude        DOUBLE PRECISION,
                longitude       DOUBLE PRECISION,
                country         TEXT,
                UNIQUE NULLS NOT DISTINCT (latitude, longitude, country)
            );
            "#
        ),
        // Tracked plants; the upstream id is the natural key and the PK.
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {schema}.plant (
                plant_id              INTEGER PRIMARY KEY,
                plant_name            TEXT NOT NULL,
                plant_scientific_name TEXT,
                plant_origin_id       INTEGER REFERENCES {schema}.plant_origin (plant_origin_id)
            );
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {schema}.botanist (
                botanist_id           SERIAL PRIMARY KEY,
                botanist_name         TEXT NOT NULL UNIQUE,
                botanist_email        TEXT,
                botanist_phone_number TEXT
            );
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {schema}.sun_condition (
                sun_condition_id   SERIAL PRIMARY KEY,
                sun_condition_type TEXT NOT NULL UNIQUE
            );
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {schema}.shade_condition (
                shade_condition_id   SERIAL PRIMARY KEY,
                shade_condition_type TEXT NOT NULL UNIQUE
            );
            "#
        ),
        // Watering events; one row per (timestamp, plant) pair.
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {schema}.water_history (
                water_history_id SERIAL PRIMARY KEY,
                time_watered     TIMESTAMPTZ NOT NULL,
                plant_id         INTEGER REFERENCES {schema}.plant (plant_id),
                UNIQUE NULLS NOT DISTINCT (time_watered, plant_id)
            );
            "#
        ),
        // Sensor readings; one row per (plant, reading time) pair.
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {schema}.reading_information (
                reading_id         SERIAL PRIMARY KEY,
                plant_id           INTEGER REFERENCES {schema}.plant (plant_id),
                plant_reading_time TIMESTAMPTZ NOT NULL,
                botanist_id        INTEGER REFERENCES {schema}.botanist (botanist_id),
                temperature        DOUBLE PRECISION,
                soil_moisture      DOUBLE PRECISION,
                sun_condition_id   INTEGER REFERENCES {schema}.sun_condition (sun_condition_id),
                shade_condition_id INTEGER REFERENCES {schema}.shade_condition (shade_condition_id),
                UNIQUE NULLS NOT DISTINCT (plant_id, plant_reading_time)
            );
            "#
        ),
        // Retention pruning scans by event time.
        format!(
            r#"
            CREATE INDEX IF NOT EXISTS idx_reading_time
                ON {schema}.reading_information (plant_reading_time);
            "#
        ),
        format!(
            r#"
            CREATE INDEX IF NOT EXISTS idx_time_watered
                ON {schema}.water_history (time_watered);
            "#
        ),
    ]
}
