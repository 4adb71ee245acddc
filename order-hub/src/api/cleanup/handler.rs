//! Cleanup API Handlers

use axum::{Json, extract::State, http::StatusCode};
use shared::response::CleanupReport;

use crate::core::ServerState;

/// Manual cleanup trigger
///
/// 200 on success, 409 while another run is in progress, 500 on failure.
/// The body is the run report in every case.
pub async fn trigger(State(state): State<ServerState>) -> (StatusCode, Json<CleanupReport>) {
    let report = state.scheduler.trigger_now().await;
    let status = match (report.success, report.error.as_deref()) {
        (true, _) => StatusCode::OK,
        (false, Some("CLEANUP_IN_PROGRESS")) => StatusCode::CONFLICT,
        (false, _) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(report))
}
