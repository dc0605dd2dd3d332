//! Read-only views of catalog progress and live leases.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/progress
pub async fn get_progress(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let progress = state.scheduler.progress().await?;
    Ok(Json(DataResponse { data: progress }))
}

/// GET /api/v1/leases
///
/// Leases held by this process, soonest expiry first.
pub async fn list_leases(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let leases = state.scheduler.active_leases().await;
    Ok(Json(DataResponse { data: leases }))
}
