//! Read-only readings endpoint for the dashboard consumer.
//!
//! `GET /readings` serves the denormalized join across the archive tables:
//! reading time, soil moisture, temperature, sun/shade condition text,
//! botanist contact details, plant names and origin coordinates. Defaults
//! to the long-term schema; `?schema=` selects the short-term tier for
//! inspecting recent rows. Column names here are the consumer's contract
//! and must stay stable.

use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info};

use crate::{Config, PlantReading};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/readings", get(handler))
}

/// Query parameters for the readings endpoint.
#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    /// Schema to read from; must name one of the two configured tiers.
    schema: Option<String>,
    limit: Option<u32>,
}

async fn handler(
    Query(params): Query<ReadingsQuery>,
    State((pool, config)): State<(PgPool, Config)>,
) -> impl IntoResponse {
    // ---
    info!("GET /readings - {:?}", params);

    let schema = match params.schema.as_deref() {
        None => config.long_term_schema.as_str(),
        Some(s) if s == config.long_term_schema || s == config.short_term_schema => s,
        Some(other) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(format!("unknown schema: {other}")),
            )
                .into_response();
        }
    };

    let limit = params.limit.unwrap_or(100).min(1000) as i64;

    let sql = format!(
        r#"
        SELECT r.plant_reading_time, r.soil_moisture, r.temperature,
               s.sun_condition_type   AS sun_condition,
               h.shade_condition_type AS shade_condition,
               b.botanist_name, b.botanist_email, b.botanist_phone_number,
               p.plant_name, p.plant_scientific_name,
               o.latitude, o.longitude, o.country
          FROM {schema}.reading_information r
          LEFT JOIN {schema}.plant           p ON r.plant_id = p.plant_id
          LEFT JOIN {schema}.plant_origin    o ON p.plant_origin_id = o.plant_origin_id
          LEFT JOIN {schema}.botanist        b ON r.botanist_id = b.botanist_id
          LEFT JOIN {schema}.sun_condition   s ON r.sun_condition_id = s.sun_condition_id
          LEFT JOIN {schema}.shade_condition h ON r.shade_condition_id = h.shade_condition_id
         ORDER BY r.plant_reading_time DESC
         LIMIT $1;
        "#
    );

    match sqlx::query_as::<_, PlantReading>(&sql)
        .bind(limit)
        .fetch_all(&pool)
        .await
    {
        Ok(readings) => {
            info!("GET /readings - Returning {} rows", readings.len());
            (StatusCode::OK, Json(readings)).into_response()
        }
        Err(e) => {
            error!("Failed to query readings: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to query readings".to_string()),
            )
                .into_response()
        }
    }
}
