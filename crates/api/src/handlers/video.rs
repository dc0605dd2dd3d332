//! Handlers for handing out videos and accepting their annotations.

use annotator_core::error::CoreError;
use annotator_core::types::{DbId, Timestamp};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::client::ClientId;
use crate::response::DataResponse;
use crate::state::AppState;

/// A video handed to a client, with the deadline of its lease.
#[derive(Debug, Serialize)]
pub struct VideoAssignment {
    pub id: DbId,
    pub filename: String,
    pub title: String,
    pub lease_expires_at: Option<Timestamp>,
}

/// Result of an annotation submission.
///
/// `annotation_saved` is false when the video was finalized but the payload
/// could not be stored; `annotation_id` is then null.
#[derive(Debug, Serialize)]
pub struct SubmissionResult {
    pub video_id: DbId,
    pub annotation_id: Option<DbId>,
    pub annotation_saved: bool,
}

/// GET /api/v1/video
///
/// Reserve a random Available video for the caller. Responds 210 while every
/// remaining video is leased to someone else and 214 once all are annotated.
pub async fn allocate_video(
    State(state): State<AppState>,
    client: ClientId,
) -> AppResult<impl IntoResponse> {
    let video = state.scheduler.allocate(client.as_str()).await?;

    Ok(Json(DataResponse {
        data: VideoAssignment {
            id: video.id,
            filename: video.filename,
            title: video.title,
            lease_expires_at: video.lease_expires_at,
        },
    }))
}

/// POST /api/v1/video/{id}
///
/// Store the annotation for a leased video and mark it Annotated.
pub async fn submit_annotation(
    State(state): State<AppState>,
    client: ClientId,
    Path(video_id): Path<DbId>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let result = match state
        .scheduler
        .complete(video_id, client.as_str(), &payload)
        .await
    {
        Ok(receipt) => SubmissionResult {
            video_id: receipt.video_id,
            annotation_id: Some(receipt.annotation_id),
            annotation_saved: true,
        },
        // The video is already Annotated; only the audit record is missing.
        Err(CoreError::Persistence(msg)) => {
            tracing::error!(
                video_id,
                client_id = %client.as_str(),
                error = %msg,
                "Annotation accepted without an audit record"
            );
            SubmissionResult {
                video_id,
                annotation_id: None,
                annotation_saved: false,
            }
        }
        Err(e) => return Err(e.into()),
    };

    Ok((StatusCode::CREATED, Json(DataResponse { data: result })))
}
