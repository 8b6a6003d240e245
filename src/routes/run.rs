//! Pipeline trigger endpoint.
//!
//! `POST /pipeline/run` executes one full extract→transform→load→archive
//! run and returns the per-step report. An external scheduler is expected
//! to call this on a fixed interval; the pipeline itself has no internal
//! timer. The run reports one overall success/failure signal via the
//! status code, with per-table detail in the body.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use sqlx::PgPool;
use tracing::{error, info};

use crate::{pipeline, Config};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/pipeline/run", post(handler))
}

async fn handler(State((pool, config)): State<(PgPool, Config)>) -> impl IntoResponse {
    // ---
    info!("POST /pipeline/run - Starting pipeline");

    let client = reqwest::Client::new();

    match pipeline::run(&pool, &client, &config).await {
        Ok(report) => {
            info!(
                "POST /pipeline/run - Done, {} rows cleaned, success={}",
                report.cleaned,
                report.succeeded()
            );
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(e) => {
            error!("Pipeline run failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Pipeline run failed"),
            )
                .into_response()
        }
    }
}
