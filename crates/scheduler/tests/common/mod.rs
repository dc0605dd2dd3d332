#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use annotator_core::error::CoreError;
use annotator_core::types::{DbId, Timestamp};
use annotator_core::video_status::VideoStatus;
use annotator_db::models::video::{StatusCounts, Video};
use annotator_events::EventBus;
use annotator_scheduler::{
    AllocationScheduler, MemoryAnnotationStore, MemoryCatalog, SchedulerConfig, VideoCatalog,
};
use async_trait::async_trait;

pub const LEASE_SECS: u64 = 20;

/// Test config: a 20 second lease, everything else default.
pub fn test_config() -> SchedulerConfig {
    SchedulerConfig {
        lease_duration: Duration::from_secs(LEASE_SECS),
        ..SchedulerConfig::default()
    }
}

pub struct Harness {
    pub catalog: Arc<MemoryCatalog>,
    pub store: Arc<MemoryAnnotationStore>,
    pub events: Arc<EventBus>,
    pub scheduler: AllocationScheduler,
}

pub fn harness(statuses: &[VideoStatus]) -> Harness {
    harness_with(MemoryCatalog::with_statuses(statuses), test_config())
}

pub fn harness_with(catalog: MemoryCatalog, config: SchedulerConfig) -> Harness {
    let catalog = Arc::new(catalog);
    let store = Arc::new(MemoryAnnotationStore::new());
    let events = Arc::new(EventBus::default());
    let scheduler = AllocationScheduler::new(
        catalog.clone(),
        store.clone(),
        Arc::clone(&events),
        config,
    );
    Harness {
        catalog,
        store,
        events,
        scheduler,
    }
}

pub fn payload() -> serde_json::Value {
    serde_json::json!({
        "gait_phase": "stance",
        "abnormality": false,
        "notes": "steady cadence"
    })
}

// ---------------------------------------------------------------------------
// RacingCatalog
// ---------------------------------------------------------------------------

/// A catalog that simulates other clients acting between our read and our
/// conditional update.
///
/// - Reserving a video in `stolen` first finalizes it "elsewhere", so the
///   reservation loses.
/// - When `release_before_finalize` is set, the first Pending -> Annotated
///   update is preceded by a lease expiry releasing the video.
/// - When `release_after_empty_listing` names a video, an empty Available
///   listing is followed by that video's lease expiring.
pub struct RacingCatalog {
    pub inner: MemoryCatalog,
    pub stolen: Mutex<HashSet<DbId>>,
    pub release_before_finalize: Mutex<bool>,
    pub release_after_empty_listing: Mutex<Option<DbId>>,
    pub reserve_attempts: AtomicUsize,
}

impl RacingCatalog {
    pub fn new(inner: MemoryCatalog) -> Self {
        Self {
            inner,
            stolen: Mutex::new(HashSet::new()),
            release_before_finalize: Mutex::new(false),
            release_after_empty_listing: Mutex::new(None),
            reserve_attempts: AtomicUsize::new(0),
        }
    }

    pub fn steal(&self, ids: &[DbId]) {
        self.stolen.lock().unwrap().extend(ids.iter().copied());
    }
}

#[async_trait]
impl VideoCatalog for RacingCatalog {
    async fn find(&self, id: DbId) -> Result<Option<Video>, CoreError> {
        self.inner.find(id).await
    }

    async fn list_by_status(&self, status: VideoStatus) -> Result<Vec<Video>, CoreError> {
        let listed = self.inner.list_by_status(status).await?;
        if status == VideoStatus::Available && listed.is_empty() {
            let expiring = self.release_after_empty_listing.lock().unwrap().take();
            if let Some(id) = expiring {
                self.inner.release(id).await?;
            }
        }
        Ok(listed)
    }

    async fn status_counts(&self) -> Result<StatusCounts, CoreError> {
        self.inner.status_counts().await
    }

    async fn compare_and_set_status(
        &self,
        id: DbId,
        expected: VideoStatus,
        next: VideoStatus,
        lease_expires_at: Option<Timestamp>,
    ) -> Result<bool, CoreError> {
        if expected == VideoStatus::Available && next == VideoStatus::Pending {
            self.reserve_attempts.fetch_add(1, Ordering::SeqCst);
            if self.stolen.lock().unwrap().contains(&id) {
                self.inner.set_status(id, VideoStatus::Annotated);
            }
        }

        if expected == VideoStatus::Pending && next == VideoStatus::Annotated {
            let fire = std::mem::replace(&mut *self.release_before_finalize.lock().unwrap(), false);
            if fire {
                self.inner
                    .compare_and_set_status(id, VideoStatus::Pending, VideoStatus::Available, None)
                    .await?;
            }
        }

        self.inner
            .compare_and_set_status(id, expected, next, lease_expires_at)
            .await
    }
}
