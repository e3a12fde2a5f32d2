//! Scheduled-job endpoints, guarded by a shared secret header.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;

use crate::cleanup::{self, SweepReport};
use crate::error::ApiError;
use crate::AppState;

const CRON_SECRET_HEADER: &str = "x-cron-secret";

pub async fn cleanup_designs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepReport>, ApiError> {
    let expected = state.cron_secret.as_deref().ok_or(ApiError::Unauthorized)?;
    let supplied = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    if supplied != expected {
        return Err(ApiError::Unauthorized);
    }
    Ok(Json(cleanup::sweep_expired_designs(&state, Utc::now()).await))
}
