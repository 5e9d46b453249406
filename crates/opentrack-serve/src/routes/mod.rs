//! Route definitions.

mod health;
mod pixel;
mod status;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::middleware;
use axum::response::Response;
use axum::routing::get;

use crate::state::AppState;

/// Build the complete router.
///
/// # Route Structure
///
/// ### Pixel
/// - `GET /track/{email_id}` - Tracking pixel, records an open
/// - `GET /track/{email_id}/{*rest}` - Same, trailing segments ignored
/// - `GET /track/` - Pixel for a missing identifier
///
/// ### Status
/// - `GET /status/{email_id}` - Opened flag, count, first/last open
/// - `GET /status/{email_id}/history` - Every recorded open
/// - `GET /stats/{email_id}` - Open count only (`{"opens": N}`)
///
/// ### Ops
/// - `GET /health` - Health check
pub fn router(state: AppState) -> Router {
    let pixel = Router::new()
        .route("/track/", get(pixel::track_without_id))
        .route("/track/{email_id}", get(pixel::track))
        .route("/track/{email_id}/{*rest}", get(pixel::track));

    let status = Router::new()
        .route("/status/{email_id}", get(status::status))
        .route("/status/{email_id}/history", get(status::history))
        .route("/stats/{email_id}", get(status::legacy_stats))
        .route("/health", get(health::health_check))
        .layer(middleware::map_response(add_no_store));

    Router::new().merge(pixel).merge(status).with_state(state)
}

/// Status answers change with every open, so no intermediary may keep them.
async fn add_no_store(response: Response) -> Response {
    let (mut parts, body) = response.into_parts();
    parts
        .headers
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Response::from_parts(parts, body)
}
