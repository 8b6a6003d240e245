use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TableLoad {
    table: String,
    attempted: u64,
    inserted: u64,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableMigration {
    table: String,
    copied: u64,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TablePrune {
    table: String,
    deleted: u64,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArchiveReport {
    migrated: Vec<TableMigration>,
    pruned: Vec<TablePrune>,
}

#[derive(Debug, Deserialize)]
struct RunReport {
    fetched: usize,
    cleaned: usize,
    load: Vec<TableLoad>,
    archive: Option<ArchiveReport>,
}

#[derive(Debug, Deserialize)]
struct PlantReading {
    plant_reading_time: DateTime<Utc>,
    soil_moisture: Option<f64>,
    temperature: Option<f64>,
    sun_condition: Option<String>,
    shade_condition: Option<String>,
    botanist_name: Option<String>,
    plant_name: Option<String>,
    country: Option<String>,
}

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into())
}

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    // ---
    let client = Client::new();
    let response = client.get(format!("{}/health", base_url())).send().await?;

    assert!(response.status().is_success());
    Ok(())
}

#[tokio::test]
async fn pipeline_run_is_idempotent() -> Result<()> {
    // ---
    let client = Client::new();
    let url = format!("{}/pipeline/run", base_url());

    let first: RunReport = client.post(&url).send().await?.json().await?;

    assert!(first.fetched > 0, "No records fetched from the plant API");
    assert!(first.cleaned > 0, "No records survived cleaning");
    assert!(first.cleaned <= first.fetched);

    // All seven load steps ran without error.
    let tables: Vec<&str> = first.load.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(
        tables,
        vec![
            "plant_origin",
            "plant",
            "botanist",
            "sun_condition",
            "shade_condition",
            "water_history",
            "reading_information",
        ]
    );
    for step in &first.load {
        assert!(
            step.error.is_none(),
            "Load step {} failed: {:?}",
            step.table,
            step.error
        );
        assert!(step.inserted <= step.attempted);
    }

    let archive = first.archive.expect("archive cycle did not run");
    for table in &archive.migrated {
        assert!(
            table.error.is_none(),
            "Migration of {} failed: {:?}",
            table.table,
            table.error
        );
    }
    for table in &archive.pruned {
        assert!(
            table.error.is_none(),
            "Prune of {} failed after {} deletions",
            table.table,
            table.deleted
        );
    }

    // Second run: the same plants and botanists already exist, so the
    // dimension inserts must all conflict-skip.
    let second: RunReport = client.post(&url).send().await?.json().await?;

    for step in &second.load {
        assert!(step.error.is_none());
        if step.table == "plant" || step.table == "botanist" {
            assert_eq!(
                step.inserted, 0,
                "Re-run inserted duplicate {} rows",
                step.table
            );
        }
    }

    // Migration of a just-migrated batch copies nothing new for the
    // dimension tables.
    let archive = second.archive.expect("archive cycle did not run");
    for table in &archive.migrated {
        assert!(table.error.is_none());
        if table.table == "plant" || table.table == "botanist" {
            assert_eq!(table.copied, 0, "Re-migration duplicated {}", table.table);
        }
    }

    Ok(())
}

#[tokio::test]
async fn readings_endpoint_serves_denormalized_rows() -> Result<()> {
    // ---
    let client = Client::new();

    // The short-term tier is populated by the most recent run.
    let url = format!("{}/readings?schema=short_term&limit=50", base_url());
    let readings: Vec<PlantReading> = client.get(&url).send().await?.json().await?;

    assert!(!readings.is_empty(), "No readings returned from {}", url);
    assert!(readings.len() <= 50, "Limit not applied");

    for reading in readings.iter().take(5) {
        // ---
        assert!(
            reading.plant_reading_time > DateTime::from_timestamp(0, 0).unwrap(),
            "plant_reading_time should be valid"
        );

        // Lookup-key text is lowercased by the transformer.
        for text in [
            &reading.plant_name,
            &reading.botanist_name,
            &reading.sun_condition,
            &reading.shade_condition,
            &reading.country,
        ]
        .into_iter()
        .flatten()
        {
            assert_eq!(text, &text.to_lowercase(), "text field not normalized");
        }

        // Temperatures outside the sensor range are nulled at transform time.
        if let Some(t) = reading.temperature {
            assert!((-40.0..=75.0).contains(&t), "out-of-range temperature {t}");
        }

        // Exercise the remaining columns so the deserialized shape is checked.
        let _ = (&reading.soil_moisture, &reading.botanist_name);
    }

    Ok(())
}

#[tokio::test]
async fn readings_endpoint_rejects_unknown_schema() -> Result<()> {
    // ---
    let client = Client::new();
    let url = format!("{}/readings?schema=not_a_tier", base_url());

    let response = client.get(&url).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    Ok(())
}
