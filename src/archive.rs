//! Retention and migration: copy-forward into the long-term schema, then
//! prune expired short-term fact rows.
//!
//! Migration is an anti-join per table: rows present in short-term but
//! absent from long-term, matched on natural key. Surrogate ids are
//! schema-local and never compared across schemas; foreign keys are
//! re-resolved against the long-term dimension rows during the copy.
//! Pruning deletes only fact rows older than the retention window that
//! already exist in long-term, so migration and pruning stay safely
//! reorderable. Dimension rows are never pruned.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::Config;

/// Short-term rows older than this are eligible for pruning.
pub const RETENTION_HOURS: i64 = 24;

// ---

/// Outcome of one table's migration step.
#[derive(Debug, Clone, Serialize)]
pub struct TableMigration {
    // ---
    pub table: String,
    pub copied: u64,
    pub error: Option<String>,
}

/// Outcome of one table's prune step.
#[derive(Debug, Clone, Serialize)]
pub struct TablePrune {
    // ---
    pub table: String,
    pub deleted: u64,
    pub error: Option<String>,
}

/// Combined outcome of one migrate-then-prune cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    // ---
    pub migrated: Vec<TableMigration>,
    pub pruned: Vec<TablePrune>,
}

// ---

/// Run one full archive cycle: migrate every table, then prune expired
/// fact rows. Running the cycle twice with no new data is a no-op both
/// times. A failing table is logged and the cycle continues with the
/// next one.
pub async fn run_cycle(pool: &PgPool, cfg: &Config) -> ArchiveReport {
    // ---
    tracing::info!("Archive cycle: migrating short-term rows to long-term");
    let mut migrated = Vec::new();
    for (table, sql) in migration_statements(&cfg.short_term_schema, &cfg.long_term_schema) {
        match sqlx::query(&sql).execute(pool).await {
            Ok(result) => {
                tracing::debug!("Migrated {}: {} rows copied", table, result.rows_affected());
                migrated.push(TableMigration {
                    table: table.to_string(),
                    copied: result.rows_affected(),
                    error: None,
                });
            }
            Err(e) => {
                tracing::error!("Failed to migrate {}: {}", table, e);
                migrated.push(TableMigration {
                    table: table.to_string(),
                    copied: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    tracing::info!("Archive cycle: pruning rows older than {}h", RETENTION_HOURS);
    let cutoff = retention_cutoff(Utc::now());
    let mut pruned = Vec::new();
    for (table, sql) in prune_statements(&cfg.short_term_schema, &cfg.long_term_schema) {
        match sqlx::query(&sql).bind(cutoff).execute(pool).await {
            Ok(result) => {
                tracing::debug!("Pruned {}: {} rows deleted", table, result.rows_affected());
                pruned.push(TablePrune {
                    table: table.to_string(),
                    deleted: result.rows_affected(),
                    error: None,
                });
            }
            Err(e) => {
                tracing::error!("Failed to prune {}: {}", table, e);
                pruned.push(TablePrune {
                    table: table.to_string(),
                    deleted: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    ArchiveReport { migrated, pruned }
}

/// Events strictly before this instant have aged out of the short-term
/// tier.
fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    // ---
    now - Duration::hours(RETENTION_HOURS)
}

// ---

/// Anti-join copy statements, parents first so re-resolved foreign keys
/// find their long-term dimension rows.
fn migration_statements(st: &str, lt: &str) -> Vec<(&'static str, String)> {
    // ---
    vec![
        (
            "sun_condition",
            format!(
                r#"
                INSERT INTO {lt}.sun_condition (sun_condition_type)
                SELECT src.sun_condition_type
                  FROM {st}.sun_condition src
                 WHERE NOT EXISTS
                       (SELECT 1 FROM {lt}.sun_condition dst
                         WHERE dst.sun_condition_type = src.sun_condition_type);
                "#
            ),
        ),
        (
            "shade_condition",
            format!(
                r#"
                INSERT INTO {lt}.shade_condition (shade_condition_type)
                SELECT src.shade_condition_type
                  FROM {st}.shade_condition src
                 WHERE NOT EXISTS
                       (SELECT 1 FROM {lt}.shade_condition dst
                         WHERE dst.shade_condition_type = src.shade_condition_type);
                "#
            ),
        ),
        (
            "botanist",
            format!(
                r#"
                INSERT INTO {lt}.botanist (botanist_name, botanist_email, botanist_phone_number)
                SELECT src.botanist_name, src.botanist_email, src.botanist_phone_number
                  FROM {st}.botanist src
                 WHERE NOT EXISTS
                       (SELECT 1 FROM {lt}.botanist dst
                         WHERE dst.botanist_name = src.botanist_name);
                "#
            ),
        ),
        (
            "plant_origin",
            format!(
                r#"
                INSERT INTO {lt}.plant_origin (latitude, longitude, country)
                SELECT src.latitude, src.longitude, src.country
                  FROM {st}.plant_origin src
                 WHERE NOT EXISTS
                       (SELECT 1 FROM {lt}.plant_origin dst
                         WHERE dst.latitude  IS NOT DISTINCT FROM src.latitude
                           AND dst.longitude IS NOT DISTINCT FROM src.longitude
                           AND dst.country   IS NOT DISTINCT FROM src.country);
                "#
            ),
        ),
        (
            "plant",
            format!(
                r#"
                INSERT INTO {lt}.plant (plant_id, plant_name, plant_scientific_name, plant_origin_id)
                SELECT src.plant_id, src.plant_name, src.plant_scientific_name,
                       (SELECT dst_o.plant_origin_id FROM {lt}.plant_origin dst_o
                         WHERE dst_o.latitude  IS NOT DISTINCT FROM src_o.latitude
                           AND dst_o.longitude IS NOT DISTINCT FROM src_o.longitude
                           AND dst_o.country   IS NOT DISTINCT FROM src_o.country
                         LIMIT 1)
                  FROM {st}.plant src
                  LEFT JOIN {st}.plant_origin src_o
                         ON src.plant_origin_id = src_o.plant_origin_id
                 WHERE NOT EXISTS
                       (SELECT 1 FROM {lt}.plant dst WHERE dst.plant_id = src.plant_id);
                "#
            ),
        ),
        (
            "water_history",
            format!(
                r#"
                INSERT INTO {lt}.water_history (time_watered, plant_id)
                SELECT src.time_watered, src.plant_id
                  FROM {st}.water_history src
                 WHERE NOT EXISTS
                       (SELECT 1 FROM {lt}.water_history dst
                         WHERE dst.time_watered = src.time_watered
                           AND dst.plant_id IS NOT DISTINCT FROM src.plant_id);
                "#
            ),
        ),
        (
            "reading_information",
            format!(
                r#"
                INSERT INTO {lt}.reading_information
                    (plant_id, plant_reading_time, botanist_id,
                     temperature, soil_moisture, sun_condition_id, shade_condition_id)
                SELECT src.plant_id, src.plant_reading_time,
                       (SELECT dst_b.botanist_id FROM {lt}.botanist dst_b
                         WHERE dst_b.botanist_name = src_b.botanist_name),
                       src.temperature, src.soil_moisture,
                       (SELECT dst_s.sun_condition_id FROM {lt}.sun_condition dst_s
                         WHERE dst_s.sun_condition_type = src_s.sun_condition_type),
                       (SELECT dst_h.shade_condition_id FROM {lt}.shade_condition dst_h
                         WHERE dst_h.shade_condition_type = src_h.shade_condition_type)
                  FROM {st}.reading_information src
                  LEFT JOIN {st}.botanist src_b
                         ON src.botanist_id = src_b.botanist_id
                  LEFT JOIN {st}.sun_condition src_s
                         ON src.sun_condition_id = src_s.sun_condition_id
                  LEFT JOIN {st}.shade_condition src_h
                         ON src.shade_condition_id = src_h.shade_condition_id
                 WHERE NOT EXISTS
                       (SELECT 1 FROM {lt}.reading_information dst
                         WHERE dst.plant_id IS NOT DISTINCT FROM src.plant_id
                           AND dst.plant_reading_time = src.plant_reading_time);
                "#
            ),
        ),
    ]
}

/// Delete statements for the fact tables only. `$1` is the retention
/// cutoff; the EXISTS guard keeps rows that have not reached long-term
/// yet, whatever the reason.
fn prune_statements(st: &str, lt: &str) -> Vec<(&'static str, String)> {
    // ---
    vec![
        (
            "water_history",
            format!(
                r#"
                DELETE FROM {st}.water_history src
                 WHERE src.time_watered < $1
                   AND EXISTS
                       (SELECT 1 FROM {lt}.water_history dst
                         WHERE dst.time_watered = src.time_watered
                           AND dst.plant_id IS NOT DISTINCT FROM src.plant_id);
                "#
            ),
        ),
        (
            "reading_information",
            format!(
                r#"
                DELETE FROM {st}.reading_information src
                 WHERE src.plant_reading_time < $1
                   AND EXISTS
                       (SELECT 1 FROM {lt}.reading_information dst
                         WHERE dst.plant_id IS NOT DISTINCT FROM src.plant_id
                           AND dst.plant_reading_time = src.plant_reading_time);
                "#
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn retention_window_is_24_hours() {
        // ---
        let now = Utc::now();
        let cutoff = retention_cutoff(now);

        // A reading from 25 hours ago is eligible for pruning; one from
        // 23 hours ago is retained.
        assert!(now - Duration::hours(25) < cutoff);
        assert!(now - Duration::hours(23) >= cutoff);
    }

    #[test]
    fn migration_covers_every_table_parents_first() {
        // ---
        let tables: Vec<&str> = migration_statements("short_term", "long_term")
            .iter()
            .map(|(table, _)| *table)
            .collect();

        assert_eq!(
            tables,
            vec![
                "sun_condition",
                "shade_condition",
                "botanist",
                "plant_origin",
                "plant",
                "water_history",
                "reading_information",
            ]
        );

        // Dimensions a fact or entity row resolves against come earlier.
        let pos = |t: &str| tables.iter().position(|x| *x == t).unwrap();
        assert!(pos("plant_origin") < pos("plant"));
        assert!(pos("plant") < pos("water_history"));
        assert!(pos("botanist") < pos("reading_information"));
        assert!(pos("sun_condition") < pos("reading_information"));
    }

    #[test]
    fn migration_matches_on_natural_keys_not_surrogates() {
        // ---
        for (table, sql) in migration_statements("short_term", "long_term") {
            assert!(sql.contains("NOT EXISTS"), "{table} lacks anti-join");

            // Surrogate ids must never cross the schema boundary.
            match table {
                "plant_origin" => assert!(!sql.contains("dst.plant_origin_id")),
                "botanist" => assert!(!sql.contains("dst.botanist_id")),
                "water_history" => assert!(!sql.contains("water_history_id")),
                "reading_information" => assert!(!sql.contains("dst.reading_id")),
                _ => {}
            }
        }
    }

    #[test]
    fn prune_touches_fact_tables_only_and_requires_migration() {
        // ---
        let statements = prune_statements("short_term", "long_term");
        let tables: Vec<&str> = statements.iter().map(|(table, _)| *table).collect();

        assert_eq!(tables, vec!["water_history", "reading_information"]);

        for (table, sql) in &statements {
            assert!(sql.contains("< $1"), "{table} lacks a cutoff");
            assert!(
                sql.contains("EXISTS"),
                "{table} would prune unmigrated rows"
            );
            assert!(sql.contains("DELETE FROM short_term."), "{table} targets wrong schema");
        }
    }
}
