//! Open-status endpoints.
//!
//! Every query rescans the event log on the blocking pool.

use axum::Json;
use axum::extract::{Path, State};
use opentrack_core::{EmailId, OpenEvent, format_timestamp};
use opentrack_log::StatusAggregator;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Open status for one identifier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub email_id: String,
    pub opened: bool,
    pub open_count: usize,
    /// Matching events flagged as automated mail-proxy fetches.
    pub proxy_opens: usize,
    pub first_opened: Option<String>,
    pub last_opened: Option<String>,
}

/// Full event history for one identifier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub success: bool,
    pub email_id: String,
    pub events: Vec<OpenEvent>,
}

/// Response shape of the original `/stats` route.
#[derive(Debug, Clone, Serialize)]
pub struct LegacyStatsResponse {
    pub opens: usize,
}

/// `GET /status/{email_id}`
///
/// Unknown and unopened identifiers both answer `opened: false` with zero
/// counts and null timestamps.
pub async fn status(
    State(state): State<AppState>,
    Path(email_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let email_id = EmailId::from(email_id);
    let status = query(&state, email_id.clone(), |agg, id| agg.get_status(id)).await?;

    Ok(Json(StatusResponse {
        success: true,
        email_id: email_id.into_inner(),
        opened: status.opened,
        open_count: status.open_count,
        proxy_opens: status.proxy_opens,
        first_opened: status.first_opened.as_ref().map(format_timestamp),
        last_opened: status.last_opened.as_ref().map(format_timestamp),
    }))
}

/// `GET /status/{email_id}/history`
pub async fn history(
    State(state): State<AppState>,
    Path(email_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let aggregate = query(&state, EmailId::from(email_id), |agg, id| agg.aggregate(id)).await?;

    Ok(Json(HistoryResponse {
        success: true,
        email_id: aggregate.email_id.into_inner(),
        events: aggregate.history,
    }))
}

/// `GET /stats/{email_id}`
pub async fn legacy_stats(
    State(state): State<AppState>,
    Path(email_id): Path<String>,
) -> Result<Json<LegacyStatsResponse>, ApiError> {
    let status = query(&state, EmailId::from(email_id), |agg, id| agg.get_status(id)).await?;

    Ok(Json(LegacyStatsResponse {
        opens: status.open_count,
    }))
}

/// Run a log query on the blocking pool.
async fn query<T, F>(state: &AppState, email_id: EmailId, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&StatusAggregator, &EmailId) -> opentrack_log::Result<T> + Send + 'static,
{
    let aggregator = state.status.clone();

    let result = tokio::task::spawn_blocking(move || f(&aggregator, &email_id))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("status task failed: {}", e)))??;

    Ok(result)
}
