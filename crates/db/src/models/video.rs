//! Video entity model and DTOs.

use annotator_core::selection::Candidate;
use annotator_core::types::{DbId, Timestamp};
use annotator_core::video_status::{StatusId, VideoStatus};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `videos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Video {
    pub id: DbId,
    pub title: String,
    pub filename: String,
    pub status_id: StatusId,
    /// Set while the video is Pending; when the reservation auto-releases.
    pub lease_expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Video {
    /// Decode `status_id`. `None` only if the row holds an unknown ID.
    pub fn status(&self) -> Option<VideoStatus> {
        VideoStatus::from_id(self.status_id)
    }
}

impl Candidate for Video {
    fn candidate_id(&self) -> DbId {
        self.id
    }
}

/// DTO for registering a video (ingestion, fixtures).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVideo {
    pub title: String,
    pub filename: String,
}

/// Count of videos per lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct StatusCounts {
    pub available: i64,
    pub pending: i64,
    pub annotated: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.available + self.pending + self.annotated
    }
}
