//! Health check endpoint.

use axum::Json;
use chrono::Utc;
use opentrack_core::format_timestamp;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
}

/// Public health check endpoint.
///
/// Use this for load balancer health probes.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: format_timestamp(&Utc::now()),
        version: env!("CARGO_PKG_VERSION"),
    })
}
