//! Data models for the plant pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Nested botanist group as delivered by the upstream API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotanistDetails {
    // ---
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Raw plant record from the API.
///
/// Every field is optional: the upstream payload is inconsistently shaped
/// and missing keys must degrade to `None`, never fail deserialization.
/// Error responses carry an `error` marker instead of plant data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlantRecord {
    // ---
    pub plant_id: Option<i32>,
    pub name: Option<String>,
    /// Zero or more scientific names; collapsed to one string later.
    pub scientific_name: Option<Vec<String>>,
    pub cycle: Option<String>,
    /// RFC-1123-style string, e.g. "Mon, 1 Jan 2023 00:00:00 GMT".
    pub last_watered: Option<String>,
    /// "YYYY-MM-DD HH:MM:SS" string.
    pub recording_taken: Option<String>,
    pub temperature: Option<f64>,
    pub soil_moisture: Option<f64>,
    /// Free-text sun/shade descriptors, possibly duplicated or "/"-joined.
    pub sunlight: Option<Vec<String>>,
    /// Latitude, longitude, then trailing location tokens; country is last.
    pub origin_location: Option<Vec<String>>,
    pub botanist: Option<BotanistDetails>,
    /// Error marker set by the API when the id has no plant.
    pub error: Option<String>,
}

/// One flattened record, produced per raw record by the normalizer.
///
/// Geolocation and contact values are still raw strings at this stage;
/// typing and cleanup happen in the batch transformer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatPlantRecord {
    // ---
    pub plant_id: Option<i32>,
    pub plant_name: Option<String>,
    pub scientific_name: Option<Vec<String>>,
    pub plant_cycle: Option<String>,
    pub botanist_name: Option<String>,
    pub botanist_email: Option<String>,
    pub botanist_phone: Option<String>,
    pub last_watered: Option<String>,
    pub recording_time: Option<String>,
    pub origin_latitude: Option<String>,
    pub origin_longitude: Option<String>,
    pub origin_country: Option<String>,
    pub soil_moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub sun_condition: String,
    pub shade_condition: String,
}

/// One cleaned row, ready for relational loading.
///
/// Guaranteed by the transformer: `plant_name` is non-empty and at least
/// one of `last_watered` / `recording_time` is set. Everything else may
/// be `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedPlantRow {
    // ---
    pub plant_id: Option<i32>,
    pub plant_name: String,
    pub scientific_name: Option<String>,
    pub plant_cycle: Option<String>,
    pub botanist_name: Option<String>,
    pub botanist_email: Option<String>,
    pub botanist_phone: Option<String>,
    pub last_watered: Option<DateTime<Utc>>,
    pub recording_time: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: Option<String>,
    pub soil_moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub sun_condition: String,
    pub shade_condition: String,
}

/// Denormalized reading row served to the dashboard consumer.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PlantReading {
    // ---
    pub plant_reading_time: DateTime<Utc>,
    pub soil_moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub sun_condition: Option<String>,
    pub shade_condition: Option<String>,
    pub botanist_name: Option<String>,
    pub botanist_email: Option<String>,
    pub botanist_phone_number: Option<String>,
    pub plant_name: Option<String>,
    pub plant_scientific_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: Option<String>,
}
