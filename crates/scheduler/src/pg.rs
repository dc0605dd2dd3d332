//! PostgreSQL-backed catalog and annotation store.

use annotator_core::error::CoreError;
use annotator_core::types::{DbId, Timestamp};
use annotator_core::video_status::VideoStatus;
use annotator_db::models::video::{StatusCounts, Video};
use annotator_db::repositories::{AnnotationRepo, VideoRepo};
use annotator_db::DbPool;
use async_trait::async_trait;

use crate::annotation_store::AnnotationStore;
use crate::catalog::{check_transition, VideoCatalog};

fn catalog_error(op: &str, err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, op, "Catalog query failed");
    CoreError::Internal(format!("Catalog {op} failed: {err}"))
}

/// [`VideoCatalog`] over the `videos` table.
#[derive(Clone)]
pub struct PgVideoCatalog {
    pool: DbPool,
}

impl PgVideoCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoCatalog for PgVideoCatalog {
    async fn find(&self, id: DbId) -> Result<Option<Video>, CoreError> {
        VideoRepo::find_by_id(&self.pool, id)
            .await
            .map_err(|e| catalog_error("find", e))
    }

    async fn list_by_status(&self, status: VideoStatus) -> Result<Vec<Video>, CoreError> {
        VideoRepo::list_by_status(&self.pool, status)
            .await
            .map_err(|e| catalog_error("list", e))
    }

    async fn status_counts(&self) -> Result<StatusCounts, CoreError> {
        VideoRepo::status_counts(&self.pool)
            .await
            .map_err(|e| catalog_error("count", e))
    }

    async fn compare_and_set_status(
        &self,
        id: DbId,
        expected: VideoStatus,
        next: VideoStatus,
        lease_expires_at: Option<Timestamp>,
    ) -> Result<bool, CoreError> {
        check_transition(expected, next)?;

        VideoRepo::compare_and_set_status(&self.pool, id, expected, next, lease_expires_at)
            .await
            .map_err(|e| catalog_error("status update", e))
    }
}

/// [`AnnotationStore`] over the `annotations` table.
#[derive(Clone)]
pub struct PgAnnotationStore {
    pool: DbPool,
}

impl PgAnnotationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnnotationStore for PgAnnotationStore {
    async fn save(
        &self,
        video_id: DbId,
        client_id: &str,
        payload: &serde_json::Value,
    ) -> Result<DbId, CoreError> {
        AnnotationRepo::create(&self.pool, video_id, client_id, payload)
            .await
            .map(|annotation| annotation.id)
            .map_err(|e| CoreError::Persistence(e.to_string()))
    }
}
