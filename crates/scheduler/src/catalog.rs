//! The video catalog seam.
//!
//! Backends implement four primitive operations. Reservation, release and
//! finalization are provided on top of [`VideoCatalog::compare_and_set_status`]
//! so every backend resolves the reserve-vs-reserve and release-vs-finalize
//! races the same way.

use annotator_core::error::CoreError;
use annotator_core::lease_policy::{FinalizePolicy, FINALIZE_MAX_ATTEMPTS};
use annotator_core::types::{DbId, Timestamp};
use annotator_core::video_status::VideoStatus;
use annotator_db::models::video::{StatusCounts, Video};
use async_trait::async_trait;

/// Result of a finalize attempt that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The video moved to Annotated from `from`.
    Finalized { from: VideoStatus },
    /// The video was already Annotated; nothing changed.
    AlreadyAnnotated,
    /// The policy refused the current status (strict policy, video Available).
    NotLeased,
}

/// Authoritative store of video status.
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Fetch a single video.
    async fn find(&self, id: DbId) -> Result<Option<Video>, CoreError>;

    /// All videos currently in `status`.
    async fn list_by_status(&self, status: VideoStatus) -> Result<Vec<Video>, CoreError>;

    /// Number of videos per status.
    async fn status_counts(&self) -> Result<StatusCounts, CoreError>;

    /// Atomically set `status = next` only if it is currently `expected`.
    ///
    /// Returns whether the transition happened. `lease_expires_at` is kept
    /// only when `next` is Pending. Implementations reject transitions the
    /// state machine forbids with [`check_transition`] before touching
    /// storage.
    async fn compare_and_set_status(
        &self,
        id: DbId,
        expected: VideoStatus,
        next: VideoStatus,
        lease_expires_at: Option<Timestamp>,
    ) -> Result<bool, CoreError>;

    /// Fetch a video or fail with `NotFound`.
    async fn require(&self, id: DbId) -> Result<Video, CoreError> {
        self.find(id).await?.ok_or(CoreError::NotFound {
            entity: "Video",
            id,
        })
    }

    async fn list_available(&self) -> Result<Vec<Video>, CoreError> {
        self.list_by_status(VideoStatus::Available).await
    }

    /// Available -> Pending. Exactly one concurrent caller wins per
    /// Available period; the others get `Ok(false)`.
    async fn try_reserve(&self, id: DbId, lease_expires_at: Timestamp) -> Result<bool, CoreError> {
        if self
            .compare_and_set_status(
                id,
                VideoStatus::Available,
                VideoStatus::Pending,
                Some(lease_expires_at),
            )
            .await?
        {
            return Ok(true);
        }
        self.require(id).await?;
        Ok(false)
    }

    /// Pending -> Available. A video that is no longer Pending is left alone.
    async fn release(&self, id: DbId) -> Result<bool, CoreError> {
        if self
            .compare_and_set_status(id, VideoStatus::Pending, VideoStatus::Available, None)
            .await?
        {
            return Ok(true);
        }
        let video = self.require(id).await?;
        tracing::debug!(
            video_id = id,
            status_id = video.status_id,
            "Release skipped, video is not pending"
        );
        Ok(false)
    }

    /// Move a video to Annotated from whatever status `policy` accepts.
    ///
    /// A lost conditional update re-reads the status and tries again, so a
    /// finalize racing a lease expiry still lands once the video is back to
    /// Available (under the lenient policy).
    async fn finalize(&self, id: DbId, policy: FinalizePolicy) -> Result<FinalizeOutcome, CoreError> {
        for attempt in 1..=FINALIZE_MAX_ATTEMPTS {
            let video = self.require(id).await?;
            let current = decode_status(&video)?;

            if current == VideoStatus::Annotated {
                return Ok(FinalizeOutcome::AlreadyAnnotated);
            }
            if !policy.accepts(current) {
                return Ok(FinalizeOutcome::NotLeased);
            }
            if self
                .compare_and_set_status(id, current, VideoStatus::Annotated, None)
                .await?
            {
                return Ok(FinalizeOutcome::Finalized { from: current });
            }
            tracing::debug!(video_id = id, attempt, from = %current, "Finalize raced, retrying");
        }

        Err(CoreError::Conflict(format!(
            "Video {id} kept changing status while being finalized"
        )))
    }
}

/// Reject `expected -> next` unless the video state machine allows it.
///
/// Keeps Annotated terminal for every caller of the compare-and-set.
pub fn check_transition(expected: VideoStatus, next: VideoStatus) -> Result<(), CoreError> {
    expected
        .validate_transition(next)
        .map_err(CoreError::Conflict)
}

/// Decode a row's status, treating unknown IDs as corrupt data.
pub fn decode_status(video: &Video) -> Result<VideoStatus, CoreError> {
    video.status().ok_or_else(|| {
        CoreError::Internal(format!(
            "Video {} has unknown status id {}",
            video.id, video.status_id
        ))
    })
}
