//! The lease protocol.
//!
//! ```text
//! Available --allocate--> Pending --complete--> Annotated
//!     ^                      |
//!     +----lease expiry------+
//! ```
//!
//! `allocate` reserves a random Available video and arms a release timer.
//! `complete` finalizes the video first, then stores the payload; the timer
//! is cancelled once the slot is consumed. Expiry and completion both go
//! through the catalog's conditional update, so when they race on one video
//! finalize wins: a release that lands first leaves the video Available,
//! which the lenient policy still finalizes.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use annotator_core::annotation::validate_payload;
use annotator_core::error::CoreError;
use annotator_core::selection::select_candidate;
use annotator_core::types::{DbId, Timestamp};
use annotator_core::video_status::VideoStatus;
use annotator_db::models::video::Video;
use annotator_events::{CatalogProgress, EventBus};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::annotation_store::AnnotationStore;
use crate::catalog::{FinalizeOutcome, VideoCatalog};
use crate::config::SchedulerConfig;
use crate::lease::{LeaseInfo, LeaseTable};

/// Client id recorded on leases re-armed at startup.
const RECOVERED_CLIENT_ID: &str = "recovered";

/// Outcome of a successful [`AllocationScheduler::complete`].
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReceipt {
    pub video_id: DbId,
    pub annotation_id: DbId,
    /// Status the video was finalized from; Available means the lease had
    /// already expired.
    pub finalized_from: VideoStatus,
    /// Whether a live lease timer was cancelled.
    pub lease_cancelled: bool,
}

/// What [`AllocationScheduler::recover_leases`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Pending videos whose stored expiry is still in the future.
    pub rearmed: usize,
    /// Pending videos with a missing or past expiry, released immediately.
    pub released: usize,
}

/// Hands out videos under timed leases.
///
/// Owns the lease table; share it via `Arc<AllocationScheduler>`.
pub struct AllocationScheduler {
    catalog: Arc<dyn VideoCatalog>,
    annotations: Arc<dyn AnnotationStore>,
    events: Arc<EventBus>,
    leases: Arc<LeaseTable>,
    config: SchedulerConfig,
}

impl AllocationScheduler {
    pub fn new(
        catalog: Arc<dyn VideoCatalog>,
        annotations: Arc<dyn AnnotationStore>,
        events: Arc<EventBus>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            catalog,
            annotations,
            events,
            leases: Arc::new(LeaseTable::new()),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Allocate
    // -----------------------------------------------------------------------

    /// Reserve a random Available video for `client_id`.
    ///
    /// Fails with [`CoreError::Exhausted`] when every video is Annotated and
    /// [`CoreError::AllPending`] when the rest are leased to other clients or
    /// every reservation attempt lost its race.
    pub async fn allocate(&self, client_id: &str) -> Result<Video, CoreError> {
        let available = self.catalog.list_available().await?;
        if available.is_empty() {
            return Err(self.classify_empty().await?);
        }

        let mut excluded: HashSet<DbId> = HashSet::new();
        for attempt in 0..=self.config.retry_budget {
            let candidate = {
                let mut rng = rand::rng();
                select_candidate(&available, &excluded, &mut rng).cloned()
            };
            let Some(mut video) = candidate else {
                break;
            };

            let expires_at = lease_deadline(self.config.lease_duration);
            let reserved = match self.catalog.try_reserve(video.id, expires_at).await {
                Ok(reserved) => reserved,
                // Deleted out of band since the listing.
                Err(CoreError::NotFound { .. }) => false,
                Err(e) => return Err(e),
            };

            if reserved {
                let lease = self
                    .arm_lease(video.id, client_id, expires_at, self.config.lease_duration)
                    .await;
                tracing::info!(
                    video_id = video.id,
                    client_id,
                    lease_id = %lease.lease_id,
                    expires_at = %expires_at,
                    "Video allocated"
                );
                video.status_id = VideoStatus::Pending.id();
                video.lease_expires_at = Some(expires_at);
                return Ok(video);
            }

            tracing::debug!(
                video_id = video.id,
                client_id,
                attempt,
                "Lost reservation race, reselecting"
            );
            excluded.insert(video.id);
        }

        tracing::warn!(
            client_id,
            candidates = available.len(),
            "Every allocation attempt lost its race"
        );
        Err(CoreError::AllPending)
    }

    /// Decide which "nothing to hand out" error applies.
    ///
    /// Exhausted only when every video is Annotated. A video released
    /// between the empty listing and the count is reported as AllPending,
    /// so the client retries instead of giving up.
    async fn classify_empty(&self) -> Result<CoreError, CoreError> {
        let counts = self.catalog.status_counts().await?;
        if counts.annotated == counts.total() {
            Ok(CoreError::Exhausted)
        } else {
            if counts.available > 0 {
                tracing::debug!(
                    available = counts.available,
                    "Videos became available after an empty listing"
                );
            }
            Ok(CoreError::AllPending)
        }
    }

    // -----------------------------------------------------------------------
    // Complete
    // -----------------------------------------------------------------------

    /// Finalize `video_id` and store its annotation.
    ///
    /// The catalog is finalized before the payload is written, so a failed
    /// write still consumes the slot and surfaces as
    /// [`CoreError::Persistence`]. A second completion of the same video is a
    /// [`CoreError::Conflict`] and writes nothing.
    pub async fn complete(
        &self,
        video_id: DbId,
        client_id: &str,
        payload: &serde_json::Value,
    ) -> Result<CompletionReceipt, CoreError> {
        validate_payload(payload)?;

        let finalized_from = match self
            .catalog
            .finalize(video_id, self.config.finalize_policy)
            .await?
        {
            FinalizeOutcome::Finalized { from } => from,
            FinalizeOutcome::AlreadyAnnotated => {
                return Err(CoreError::Conflict(format!(
                    "Video {video_id} is already annotated"
                )));
            }
            FinalizeOutcome::NotLeased => {
                return Err(CoreError::Conflict(format!(
                    "Video {video_id} is not reserved"
                )));
            }
        };

        if finalized_from == VideoStatus::Available {
            tracing::warn!(video_id, client_id, "Finalized a video whose lease had already expired");
        }

        let lease_cancelled = self.leases.cancel(video_id).await;
        self.publish_progress(video_id, client_id).await;

        match self.annotations.save(video_id, client_id, payload).await {
            Ok(annotation_id) => {
                tracing::info!(
                    video_id,
                    client_id,
                    annotation_id,
                    lease_cancelled,
                    "Annotation completed"
                );
                Ok(CompletionReceipt {
                    video_id,
                    annotation_id,
                    finalized_from,
                    lease_cancelled,
                })
            }
            Err(e) => {
                tracing::error!(
                    video_id,
                    client_id,
                    error = %e,
                    "Video finalized but annotation was not stored"
                );
                Err(match e {
                    CoreError::Persistence(msg) => CoreError::Persistence(msg),
                    other => CoreError::Persistence(other.to_string()),
                })
            }
        }
    }

    async fn publish_progress(&self, video_id: DbId, client_id: &str) {
        match self.progress().await {
            Ok(progress) => {
                let receivers = self.events.publish(
                    progress
                        .into_event()
                        .with_video(video_id)
                        .with_actor(client_id),
                );
                tracing::debug!(video_id, receivers, "Progress event published");
            }
            Err(e) => {
                tracing::warn!(video_id, error = %e, "Could not compute progress, event skipped");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Annotated vs. total videos.
    pub async fn progress(&self) -> Result<CatalogProgress, CoreError> {
        let counts = self.catalog.status_counts().await?;
        Ok(CatalogProgress {
            annotated_count: counts.annotated,
            total_count: counts.total(),
        })
    }

    pub async fn active_leases(&self) -> Vec<LeaseInfo> {
        self.leases.snapshot().await
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Re-arm or release Pending videos left over from a previous process.
    ///
    /// A stored expiry in the future gets a timer for the remaining time;
    /// a missing or past one is released immediately. Videos that already
    /// have a live lease in this process are skipped.
    pub async fn recover_leases(&self) -> Result<RecoveryReport, CoreError> {
        let mut report = RecoveryReport::default();
        let now = Utc::now();

        for video in self.catalog.list_by_status(VideoStatus::Pending).await? {
            if self.leases.contains(video.id).await {
                continue;
            }

            let remaining = video
                .lease_expires_at
                .and_then(|at| (at - now).to_std().ok())
                .filter(|d| !d.is_zero());

            match (video.lease_expires_at, remaining) {
                (Some(expires_at), Some(delay)) => {
                    self.arm_lease(video.id, RECOVERED_CLIENT_ID, expires_at, delay)
                        .await;
                    report.rearmed += 1;
                }
                _ => {
                    if self.catalog.release(video.id).await? {
                        report.released += 1;
                    }
                }
            }
        }

        tracing::info!(
            rearmed = report.rearmed,
            released = report.released,
            "Lease recovery finished"
        );
        Ok(report)
    }

    /// Cancel every lease timer. With `release_on_shutdown`, the leased
    /// videos are returned to Available. Returns how many were released.
    pub async fn shutdown(&self) -> usize {
        let drained = self.leases.drain().await;
        let count = drained.len();
        let mut released = 0;

        for lease in drained {
            let video_id = lease.video_id;
            lease.join().await;

            if !self.config.release_on_shutdown {
                continue;
            }
            match self.catalog.release(video_id).await {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(video_id, error = %e, "Failed to release video at shutdown");
                }
            }
        }

        tracing::info!(leases = count, released, "Scheduler shut down");
        released
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn arm_lease(
        &self,
        video_id: DbId,
        client_id: &str,
        expires_at: Timestamp,
        delay: Duration,
    ) -> LeaseInfo {
        let catalog = Arc::clone(&self.catalog);
        let leases = Arc::clone(&self.leases);
        self.leases
            .arm(video_id, client_id, expires_at, delay, move |lease_id| {
                expire_lease(catalog, leases, video_id, lease_id)
            })
            .await
    }
}

/// Timer body: drop our own table entry, then release the video if it is
/// still Pending.
async fn expire_lease(
    catalog: Arc<dyn VideoCatalog>,
    leases: Arc<LeaseTable>,
    video_id: DbId,
    lease_id: Uuid,
) {
    leases.remove_if(video_id, lease_id).await;

    match catalog.release(video_id).await {
        Ok(true) => {
            tracing::info!(video_id, lease_id = %lease_id, "Lease expired, video released");
        }
        Ok(false) => {
            tracing::debug!(video_id, lease_id = %lease_id, "Lease expired after video left pending");
        }
        Err(e) => {
            tracing::error!(video_id, lease_id = %lease_id, error = %e, "Failed to release expired lease");
        }
    }
}

fn lease_deadline(duration: Duration) -> Timestamp {
    let duration = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_add_signed(duration)
        .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC)
}
