//! Batch transformer: field-level cleaning and validation of flattened
//! plant records.
//!
//! Stages run in a fixed order per record: completeness filter, contact
//! extraction, scientific-name collapse, temporal parsing, geolocation
//! typing, temperature bounds, case normalization, and the final
//! temporal-anchor drop. Field failures resolve to `None`; row failures
//! drop the row; only a non-numeric coordinate on a present value is
//! batch-fatal.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{CleanedPlantRow, FlatPlantRecord};

// ---

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.-]+@[\w.-]+").expect("email pattern"));

/// Three digit groups (3-3-4) with optional dot/dash/paren separators.
/// Country prefixes and `x`-extensions fall outside the match.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(?\d{3}[.-]?\)?\(?\d{3}[.-]?\)?\(?\d{4}").expect("phone pattern")
});

/// Source format for the reading timestamp.
const READING_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Valid sensor range for temperature readings, degrees Celsius.
const TEMPERATURE_MIN: f64 = -40.0;
const TEMPERATURE_MAX: f64 = 75.0;

// ---

/// Clean a batch of flattened records into rows ready for loading.
///
/// Rows without a plant name, and rows missing both temporal anchors,
/// are dropped. All other defects stay within their field. Returns an
/// error only for the batch-level defect of a present but non-numeric
/// coordinate value.
pub fn clean_batch(records: Vec<FlatPlantRecord>) -> Result<Vec<CleanedPlantRow>> {
    // ---
    let total = records.len();
    let mut rows = Vec::with_capacity(total);

    for record in records {
        // Unusable without a display name.
        let Some(plant_name) = record
            .plant_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            tracing::debug!(plant_id = ?record.plant_id, "dropping record without plant name");
            continue;
        };
        let plant_name = plant_name.to_string();

        let latitude = parse_coordinate(record.origin_latitude.as_deref(), "latitude")?;
        let longitude = parse_coordinate(record.origin_longitude.as_deref(), "longitude")?;

        let last_watered = record.last_watered.as_deref().and_then(parse_watering_time);
        let recording_time = record.recording_time.as_deref().and_then(parse_reading_time);

        // No temporal anchor means the row can join neither the watering
        // history nor the readings table.
        if last_watered.is_none() && recording_time.is_none() {
            tracing::debug!(plant = %plant_name, "dropping record without temporal anchor");
            continue;
        }

        rows.push(CleanedPlantRow {
            plant_id: record.plant_id,
            plant_name: plant_name.to_lowercase(),
            scientific_name: collapse_scientific_name(record.scientific_name.as_deref())
                .map(|s| s.to_lowercase()),
            plant_cycle: lowercased(record.plant_cycle),
            botanist_name: lowercased(record.botanist_name),
            botanist_email: extract_email(record.botanist_email.as_deref()),
            botanist_phone: extract_phone(record.botanist_phone.as_deref()),
            last_watered,
            recording_time,
            latitude,
            longitude,
            country: lowercased(record.origin_country),
            soil_moisture: record.soil_moisture,
            temperature: record.temperature.and_then(clean_temperature),
            sun_condition: record.sun_condition.to_lowercase(),
            shade_condition: record.shade_condition.to_lowercase(),
        });
    }

    tracing::info!(
        "Cleaned batch: {} of {} records usable",
        rows.len(),
        total
    );
    Ok(rows)
}

// ---

/// Extract the first email address from a raw contact string.
pub fn extract_email(raw: Option<&str>) -> Option<String> {
    // ---
    raw.and_then(|s| EMAIL_PATTERN.find(s))
        .map(|m| m.as_str().to_string())
}

/// Extract a phone number from a raw contact string and normalize it to
/// `NNN-NNN-NNNN`. Inputs vary between dotted, dashed, parenthesized and
/// pre-grouped forms; anything unparseable resolves to `None`.
pub fn extract_phone(raw: Option<&str>) -> Option<String> {
    // ---
    let matched = raw.and_then(|s| PHONE_PATTERN.find(s))?;

    let digits: String = matched
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    Some(format!(
        "{}-{}-{}",
        &digits[..3],
        &digits[3..6],
        &digits[6..]
    ))
}

/// Collapse the upstream scientific-name list into a single value:
/// one element is unwrapped, several join with ", ", absent stays absent.
pub fn collapse_scientific_name(names: Option<&[String]>) -> Option<String> {
    // ---
    match names {
        Some([only]) => Some(only.clone()),
        Some(names) if !names.is_empty() => Some(names.join(", ")),
        _ => None,
    }
}

/// Parse the RFC-1123-style watering timestamp, e.g.
/// "Mon, 1 Jan 2023 00:00:00 GMT".
pub fn parse_watering_time(raw: &str) -> Option<DateTime<Utc>> {
    // ---
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse the "YYYY-MM-DD HH:MM:SS" reading timestamp as UTC.
pub fn parse_reading_time(raw: &str) -> Option<DateTime<Utc>> {
    // ---
    NaiveDateTime::parse_from_str(raw, READING_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Null out temperatures outside the valid sensor range; readings past
/// either bound are sensor faults, not real observations.
pub fn clean_temperature(value: f64) -> Option<f64> {
    // ---
    (TEMPERATURE_MIN..=TEMPERATURE_MAX)
        .contains(&value)
        .then_some(value)
}

/// Coerce an optional coordinate string to numeric. A present value that
/// does not parse is a schema-level defect and fails the whole batch.
fn parse_coordinate(raw: Option<&str>, field: &str) -> Result<Option<f64>> {
    // ---
    raw.map(|s| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| anyhow!("non-numeric {field} value: {s:?}"))
    })
    .transpose()
}

fn lowercased(value: Option<String>) -> Option<String> {
    // ---
    value.map(|s| s.to_lowercase())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::RawPlantRecord;
    use crate::normalize::flatten_record;
    use chrono::{TimeZone, Utc};

    #[test]
    fn email_extraction() {
        // ---
        let cases = [
            ("mockOne@example.com", "mockOne@example.com"),
            ("mockTwo@example.com Mock", "mockTwo@example.com"),
            ("Mock mockThree@example.com", "mockThree@example.com"),
            ("Mock mockFour@example.com Mock", "mockFour@example.com"),
        ];

        for (input, expected) in cases {
            assert_eq!(extract_email(Some(input)).as_deref(), Some(expected));
        }

        assert_eq!(extract_email(Some("no address here")), None);
        assert_eq!(extract_email(None), None);
    }

    #[test]
    fn phone_extraction_and_grouping() {
        // ---
        let cases = [
            ("001.251-701-7428x7358", "251-701-7428"),
            ("001-197.304-0701x96926", "197-304-0701"),
            ("531)160(8892x4734", "531-160-8892"),
            ("9766126198", "976-612-6198"),
            ("+1-233-531-2626x72126", "233-531-2626"),
        ];

        for (input, expected) in cases {
            assert_eq!(
                extract_phone(Some(input)).as_deref(),
                Some(expected),
                "input: {input}"
            );
        }

        assert_eq!(extract_phone(Some("not a number")), None);
        assert_eq!(extract_phone(None), None);
    }

    #[test]
    fn scientific_name_collapse() {
        // ---
        let single = vec!["Dionaea muscipula".to_string()];
        assert_eq!(
            collapse_scientific_name(Some(&single)).as_deref(),
            Some("Dionaea muscipula")
        );

        let multiple = vec!["Musa".to_string(), "Ensete".to_string()];
        assert_eq!(
            collapse_scientific_name(Some(&multiple)).as_deref(),
            Some("Musa, Ensete")
        );

        assert_eq!(collapse_scientific_name(Some(&[])), None);
        assert_eq!(collapse_scientific_name(None), None);
    }

    #[test]
    fn watering_time_parses_rfc1123() {
        // ---
        let parsed = parse_watering_time("Sun, 1 Jan 2023 00:00:00 GMT");
        assert_eq!(parsed, Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()));

        assert_eq!(parse_watering_time("2023-01-01 00:00:00"), None);
        assert_eq!(parse_watering_time("garbage"), None);
    }

    #[test]
    fn reading_time_parses_iso_like_format() {
        // ---
        let parsed = parse_reading_time("2023-01-01 00:00:00");
        assert_eq!(parsed, Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()));

        assert_eq!(parse_reading_time("Sun, 1 Jan 2023 00:00:00 GMT"), None);
        assert_eq!(parse_reading_time(""), None);
    }

    #[test]
    fn temperature_bounds() {
        // ---
        assert_eq!(clean_temperature(-273.15), None);
        assert_eq!(clean_temperature(5600.0), None);
        assert_eq!(clean_temperature(37.0), Some(37.0));

        // Bounds themselves are valid readings.
        assert_eq!(clean_temperature(-40.0), Some(-40.0));
        assert_eq!(clean_temperature(75.0), Some(75.0));
    }

    // ---

    fn usable_record() -> FlatPlantRecord {
        // ---
        FlatPlantRecord {
            plant_id: Some(8),
            plant_name: Some("Cactus".into()),
            recording_time: Some("2023-01-01 00:00:00".into()),
            sun_condition: "Full sun".into(),
            shade_condition: "No Information".into(),
            ..Default::default()
        }
    }

    #[test]
    fn record_without_name_is_dropped() {
        // ---
        let unnamed = FlatPlantRecord {
            plant_name: None,
            ..usable_record()
        };
        let blank = FlatPlantRecord {
            plant_name: Some("   ".into()),
            ..usable_record()
        };

        let rows = clean_batch(vec![unnamed, blank, usable_record()]).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].plant_name, "cactus");
    }

    #[test]
    fn record_without_any_temporal_anchor_is_dropped() {
        // ---
        let anchorless = FlatPlantRecord {
            last_watered: None,
            recording_time: None,
            ..usable_record()
        };
        let watered_only = FlatPlantRecord {
            last_watered: Some("Sun, 1 Jan 2023 00:00:00 GMT".into()),
            recording_time: None,
            ..usable_record()
        };

        let rows = clean_batch(vec![anchorless, watered_only]).unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].last_watered.is_some());
        assert!(rows[0].recording_time.is_none());
    }

    #[test]
    fn unparseable_timestamps_null_the_field_only() {
        // ---
        let record = FlatPlantRecord {
            last_watered: Some("not a date".into()),
            ..usable_record()
        };

        let rows = clean_batch(vec![record]).unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].last_watered.is_none());
        assert!(rows[0].recording_time.is_some());
    }

    #[test]
    fn non_numeric_coordinate_fails_the_batch() {
        // ---
        let record = FlatPlantRecord {
            origin_latitude: Some("fifty-one".into()),
            ..usable_record()
        };

        assert!(clean_batch(vec![record]).is_err());
    }

    #[test]
    fn absent_coordinates_stay_null() {
        // ---
        let rows = clean_batch(vec![usable_record()]).unwrap();

        assert!(rows[0].latitude.is_none());
        assert!(rows[0].longitude.is_none());
        assert!(rows[0].country.is_none());
    }

    #[test]
    fn venus_flytrap_end_to_end() {
        // ---
        let raw: RawPlantRecord = serde_json::from_str(
            r#"{
                "plant_id": 0,
                "name": "Venus Flytrap",
                "scientific_name": ["Dionaea muscipula"],
                "last_watered": "Mon, 12 Jun 2023 14:10:54 GMT",
                "recording_taken": "2023-06-12 14:11:00",
                "temperature": 11.5,
                "soil_moisture": 28.4,
                "sunlight": ["Full sun", "Part shade"],
                "origin_location": ["5.27", "-3.59", "CI", "Abidjan", "Africa"],
                "botanist": {
                    "name": "Gertrude Jekyll",
                    "email": "gertrude.jekyll@lnhm.co.uk",
                    "phone": "001-481-273-3691x127"
                }
            }"#,
        )
        .unwrap();

        let rows = clean_batch(vec![flatten_record(&raw)]).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];

        assert_eq!(row.plant_name, "venus flytrap");
        assert_eq!(row.scientific_name.as_deref(), Some("dionaea muscipula"));
        assert_eq!(row.sun_condition, "full sun");
        assert_eq!(row.shade_condition, "part shade");
        assert_eq!(row.latitude, Some(5.27));
        assert_eq!(row.longitude, Some(-3.59));
        assert_eq!(row.country.as_deref(), Some("africa"));
        assert_eq!(row.temperature, Some(11.5));
        assert_eq!(row.botanist_name.as_deref(), Some("gertrude jekyll"));
        assert_eq!(
            row.botanist_email.as_deref(),
            Some("gertrude.jekyll@lnhm.co.uk")
        );
        assert_eq!(row.botanist_phone.as_deref(), Some("481-273-3691"));
        assert!(row.last_watered.is_some());
        assert!(row.recording_time.is_some());
    }
}
