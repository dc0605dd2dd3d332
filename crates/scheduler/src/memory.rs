//! In-process catalog and annotation store.
//!
//! Used by the scheduler tests and for running the allocator without a
//! database. The compare-and-set runs under a single mutex, which gives the
//! same exclusivity as the conditional `UPDATE` in the PostgreSQL backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use annotator_core::error::CoreError;
use annotator_core::types::{DbId, Timestamp};
use annotator_core::video_status::VideoStatus;
use annotator_db::models::video::{CreateVideo, StatusCounts, Video};
use async_trait::async_trait;
use chrono::Utc;

use crate::annotation_store::AnnotationStore;
use crate::catalog::{check_transition, VideoCatalog};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock cannot leave a half-written entry:
    // every critical section is a single map operation.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// MemoryCatalog
// ---------------------------------------------------------------------------

/// [`VideoCatalog`] held in a mutex-guarded map.
pub struct MemoryCatalog {
    videos: Mutex<BTreeMap<DbId, Video>>,
    next_id: AtomicI64,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            videos: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Build a catalog with one video per entry of `statuses`, ids from 1.
    pub fn with_statuses(statuses: &[VideoStatus]) -> Self {
        let catalog = Self::new();
        for (i, status) in statuses.iter().enumerate() {
            let video = catalog.insert(&CreateVideo {
                title: format!("Video {}", i + 1),
                filename: format!("video_{}.mp4", i + 1),
            });
            catalog.set_status(video.id, *status);
        }
        catalog
    }

    /// Register a new Available video.
    pub fn insert(&self, input: &CreateVideo) -> Video {
        let now = Utc::now();
        let video = Video {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title: input.title.clone(),
            filename: input.filename.clone(),
            status_id: VideoStatus::Available.id(),
            lease_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        lock(&self.videos).insert(video.id, video.clone());
        video
    }

    /// Force a status, bypassing the state machine. Fixture setup only.
    pub fn set_status(&self, id: DbId, status: VideoStatus) -> bool {
        match lock(&self.videos).get_mut(&id) {
            Some(video) => {
                video.status_id = status.id();
                video.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Force a stored lease expiry on a Pending video. Fixture setup only.
    pub fn set_lease_expiry(&self, id: DbId, expires_at: Option<Timestamp>) -> bool {
        match lock(&self.videos).get_mut(&id) {
            Some(video) => {
                video.lease_expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    pub fn status_of(&self, id: DbId) -> Option<VideoStatus> {
        lock(&self.videos).get(&id).and_then(Video::status)
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoCatalog for MemoryCatalog {
    async fn find(&self, id: DbId) -> Result<Option<Video>, CoreError> {
        Ok(lock(&self.videos).get(&id).cloned())
    }

    async fn list_by_status(&self, status: VideoStatus) -> Result<Vec<Video>, CoreError> {
        Ok(lock(&self.videos)
            .values()
            .filter(|v| v.status_id == status.id())
            .cloned()
            .collect())
    }

    async fn status_counts(&self) -> Result<StatusCounts, CoreError> {
        let videos = lock(&self.videos);
        let mut counts = StatusCounts::default();
        for video in videos.values() {
            match video.status() {
                Some(VideoStatus::Available) => counts.available += 1,
                Some(VideoStatus::Pending) => counts.pending += 1,
                Some(VideoStatus::Annotated) => counts.annotated += 1,
                None => {}
            }
        }
        Ok(counts)
    }

    async fn compare_and_set_status(
        &self,
        id: DbId,
        expected: VideoStatus,
        next: VideoStatus,
        lease_expires_at: Option<Timestamp>,
    ) -> Result<bool, CoreError> {
        check_transition(expected, next)?;

        let mut videos = lock(&self.videos);
        let Some(video) = videos.get_mut(&id) else {
            return Ok(false);
        };
        if video.status_id != expected.id() {
            return Ok(false);
        }
        video.status_id = next.id();
        video.lease_expires_at = match next {
            VideoStatus::Pending => lease_expires_at,
            _ => None,
        };
        video.updated_at = Utc::now();
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// MemoryAnnotationStore
// ---------------------------------------------------------------------------

/// A stored annotation record.
#[derive(Debug, Clone)]
pub struct StoredAnnotation {
    pub id: DbId,
    pub video_id: DbId,
    pub client_id: String,
    pub payload: serde_json::Value,
}

/// [`AnnotationStore`] held in memory, one record per video.
///
/// [`set_fail_writes`](Self::set_fail_writes) makes every `save` fail, to
/// exercise the partial-failure path.
#[derive(Default)]
pub struct MemoryAnnotationStore {
    records: Mutex<Vec<StoredAnnotation>>,
    fail_writes: AtomicBool,
}

impl MemoryAnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<StoredAnnotation> {
        lock(&self.records).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AnnotationStore for MemoryAnnotationStore {
    async fn save(
        &self,
        video_id: DbId,
        client_id: &str,
        payload: &serde_json::Value,
    ) -> Result<DbId, CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Persistence(
                "annotation store unavailable".to_string(),
            ));
        }

        let mut records = lock(&self.records);
        if records.iter().any(|r| r.video_id == video_id) {
            return Err(CoreError::Persistence(format!(
                "video {video_id} already has an annotation"
            )));
        }
        let id = records.len() as DbId + 1;
        records.push(StoredAnnotation {
            id,
            video_id,
            client_id: client_id.to_string(),
            payload: payload.clone(),
        });
        Ok(id)
    }
}
