//! Record normalizer: one raw nested record in, one flat record out.
//!
//! Pure functions only. Missing keys in the raw record degrade to `None`
//! field-by-field; nothing in this module can fail.

use crate::models::{FlatPlantRecord, RawPlantRecord};

/// Sentinel for a sun/shade descriptor that is absent or ambiguous.
pub const NO_INFORMATION: &str = "No Information";

// ---

/// Resolve a single sun or shade condition from free-text descriptors.
///
/// Each descriptor is split on "/" and sub-tokens containing `keyword`
/// (case-insensitively) are collected. Exactly one candidate is returned
/// verbatim; several candidates that are case-insensitive duplicates of
/// each other collapse to the first. Anything else — no candidate, or
/// conflicting candidates — yields [`NO_INFORMATION`]: upstream duplicates
/// descriptors and joins them ambiguously, and a conflict must never
/// silently pick a winner.
pub fn resolve_condition(descriptors: &[String], keyword: &str) -> String {
    // ---
    let keyword = keyword.to_lowercase();

    let candidates: Vec<&str> = descriptors
        .iter()
        .flat_map(|d| d.split('/'))
        .filter(|token| token.to_lowercase().contains(&keyword))
        .collect();

    match candidates.as_slice() {
        [only] => only.to_string(),
        [first, rest @ ..] if all_equivalent(first, rest) => first.to_string(),
        _ => NO_INFORMATION.to_string(),
    }
}

/// True when every candidate matches `first` ignoring case.
fn all_equivalent(first: &str, rest: &[&str]) -> bool {
    // ---
    let first = first.to_lowercase();
    rest.iter().all(|c| c.to_lowercase() == first)
}

/// Flatten one raw nested record into a [`FlatPlantRecord`].
///
/// The origin list is positional: latitude first, longitude second, and
/// the country as the trailing token, present only when the list carries
/// more than the coordinate pair. Contact fields pass through raw; the
/// batch transformer cleans them.
pub fn flatten_record(raw: &RawPlantRecord) -> FlatPlantRecord {
    // ---
    let origin = raw.origin_location.as_deref().unwrap_or(&[]);
    let sunlight = raw.sunlight.as_deref().unwrap_or(&[]);
    let botanist = raw.botanist.clone().unwrap_or_default();

    FlatPlantRecord {
        plant_id: raw.plant_id,
        plant_name: raw.name.clone(),
        scientific_name: raw.scientific_name.clone(),
        plant_cycle: raw.cycle.clone(),
        botanist_name: botanist.name,
        botanist_email: botanist.email,
        botanist_phone: botanist.phone,
        last_watered: raw.last_watered.clone(),
        recording_time: raw.recording_taken.clone(),
        origin_latitude: origin.first().cloned(),
        origin_longitude: origin.get(1).cloned(),
        origin_country: (origin.len() > 2).then(|| origin.last().cloned()).flatten(),
        soil_moisture: raw.soil_moisture,
        temperature: raw.temperature,
        sun_condition: resolve_condition(sunlight, "sun"),
        shade_condition: resolve_condition(sunlight, "shade"),
    }
}
