//! Upstream extraction: one fetch-and-parse call per plant id.
//!
//! The plant API is keyed by a fixed, known id range; each id returns
//! either a nested plant record or an error marker. Records that fail to
//! parse or carry the error marker are logged and skipped; a transport
//! failure aborts the whole run.

use anyhow::{Context, Result};
use reqwest::Client;

use crate::models::RawPlantRecord;
use crate::Config;

// ---

/// Fetch raw records for every plant id in `0..=API_MAX_PLANT_ID`.
pub async fn fetch_all_plants(client: &Client, cfg: &Config) -> Result<Vec<RawPlantRecord>> {
    // ---
    let base = cfg.api_url.trim_end_matches('/');
    let mut records = Vec::new();

    for plant_id in 0..=cfg.api_max_plant_id {
        let url = format!("{base}/plants/{plant_id}");
        tracing::debug!("Fetching plant {} from: {}", plant_id, url);

        let body: serde_json::Value = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("plant API unreachable at {url}"))?
            .json()
            .await
            .with_context(|| format!("malformed response body for plant {plant_id}"))?;

        match serde_json::from_value::<RawPlantRecord>(body.clone()) {
            Ok(record) if record.error.is_some() => {
                tracing::debug!(
                    "Plant {} returned error marker: {:?}",
                    plant_id,
                    record.error
                );
            }
            Ok(mut record) => {
                record.name = record.name.map(replace_curly_quotes);
                records.push(record);
            }
            Err(e) => {
                tracing::debug!(
                    "Failed to parse plant {}: {} - Raw record: {}",
                    plant_id,
                    e,
                    body
                );
            }
        }
    }

    tracing::info!(
        "Finished fetching {} records from {} plant ids",
        records.len(),
        cfg.api_max_plant_id + 1
    );
    Ok(records)
}

/// Replace typographic apostrophes the API emits in some display names.
fn replace_curly_quotes(name: String) -> String {
    // ---
    name.replace('\u{2018}', "'").replace('\u{2019}', "'")
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn curly_quotes_become_ascii_apostrophes() {
        // ---
        assert_eq!(
            replace_curly_quotes("Bird\u{2019}s Nest Fern".into()),
            "Bird's Nest Fern"
        );
        assert_eq!(
            replace_curly_quotes("\u{2018}quoted\u{2019}".into()),
            "'quoted'"
        );
        assert_eq!(replace_curly_quotes("Cactus".into()), "Cactus");
    }
}
