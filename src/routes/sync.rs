use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::{error::Result, models::submission::PendingSubmission, AppState};

#[derive(Debug, Deserialize)]
pub struct EnqueuePayload {
    pub exam_id: String,
    pub student_data: JsonValue,
    pub answers: Vec<JsonValue>,
    #[serde(default)]
    pub violations: Vec<JsonValue>,
    pub browser_info: JsonValue,
    pub time_taken: i64,
}

/// The exam UI hands over a submission whose direct grading call failed; the
/// agent takes over delivery from here.
pub async fn enqueue_submission(
    State(state): State<AppState>,
    Json(payload): Json<EnqueuePayload>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    state.sync_service.enqueue(PendingSubmission::new(
        payload.exam_id,
        payload.student_data,
        payload.answers,
        payload.violations,
        payload.browser_info,
        payload.time_taken,
    ))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "queued": true,
            "pending": state.sync_service.pending_count()?,
        })),
    ))
}

/// Manual retry button. Returns `ran: false` when a pass is already in
/// flight, in which case nothing was attempted.
pub async fn trigger_sync(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let report = state.sync_service.sync_all().await?;
    Ok((StatusCode::OK, Json(serde_json::to_value(report)?)))
}

pub async fn get_pending(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "pending": state.sync_service.pending_count()?,
            "parked": state.sync_service.parked_count()?,
        })),
    ))
}
