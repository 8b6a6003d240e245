//! Run orchestration: fetch, normalize, transform, load, migrate, prune,
//! strictly in that order within one run.
//!
//! One run is a sequence of synchronous steps with no internal
//! parallelism; the design assumes a single writer per run. Batch-level
//! defects (unreachable source, batch-fatal validation) abort the run
//! with an error. A load-level defect stops before the archive cycle but
//! keeps prior commits; the next run's idempotent inserts re-attempt
//! whatever is missing.

use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use sqlx::PgPool;

use crate::archive::{self, ArchiveReport};
use crate::load::{self, TableLoad};
use crate::{extract, normalize, transform, Config};

// ---

/// Per-step outcome of one pipeline run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    // ---
    /// Raw records fetched from the plant API.
    pub fetched: usize,
    /// Rows surviving the batch transformer.
    pub cleaned: usize,
    /// One entry per executed load step.
    pub load: Vec<TableLoad>,
    /// Migration and prune outcomes; absent when a load failure aborted
    /// the run before the archive cycle.
    pub archive: Option<ArchiveReport>,
}

impl RunReport {
    /// True when every executed step completed without error.
    pub fn succeeded(&self) -> bool {
        // ---
        self.load.iter().all(|t| t.error.is_none())
            && self.archive.as_ref().is_some_and(|a| {
                a.migrated.iter().all(|t| t.error.is_none())
                    && a.pruned.iter().all(|t| t.error.is_none())
            })
    }
}

/// Execute one full pipeline run.
pub async fn run(pool: &PgPool, client: &Client, cfg: &Config) -> Result<RunReport> {
    // ---
    tracing::info!("Pipeline run - Step 1: fetch raw plant records");
    let raw = extract::fetch_all_plants(client, cfg).await?;
    let fetched = raw.len();

    tracing::info!("Pipeline run - Step 2: flatten nested records");
    let flat: Vec<_> = raw.iter().map(normalize::flatten_record).collect();

    tracing::info!("Pipeline run - Step 3: clean and validate batch");
    let rows = transform::clean_batch(flat)?;
    let cleaned = rows.len();

    tracing::info!("Pipeline run - Step 4: load short-term schema");
    let load_reports = load::load_batch(pool, cfg, &rows).await;

    if load_reports.iter().any(|t| t.error.is_some()) {
        tracing::warn!("Load step failed; skipping archive cycle for this run");
        return Ok(RunReport {
            fetched,
            cleaned,
            load: load_reports,
            archive: None,
        });
    }

    tracing::info!("Pipeline run - Step 5: archive cycle");
    let archive_report = archive::run_cycle(pool, cfg).await;

    let report = RunReport {
        fetched,
        cleaned,
        load: load_reports,
        archive: Some(archive_report),
    };

    tracing::info!(
        "Pipeline run complete: {} fetched, {} cleaned, success={}",
        report.fetched,
        report.cleaned,
        report.succeeded()
    );
    Ok(report)
}
