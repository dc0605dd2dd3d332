//! Repository for the `annotations` table.

use annotator_core::types::DbId;
use sqlx::PgPool;

use crate::models::annotation::Annotation;

/// Column list for annotations queries.
const COLUMNS: &str = "id, video_id, client_id, payload, created_at";

/// Provides insert/read operations for submitted annotations.
pub struct AnnotationRepo;

impl AnnotationRepo {
    /// Store a submitted annotation, returning the created row.
    ///
    /// Fails with a unique violation on `uq_annotations_video_id` if the
    /// video already has an annotation.
    pub async fn create(
        pool: &PgPool,
        video_id: DbId,
        client_id: &str,
        payload: &serde_json::Value,
    ) -> Result<Annotation, sqlx::Error> {
        let query = format!(
            "INSERT INTO annotations (video_id, client_id, payload) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(video_id)
            .bind(client_id)
            .bind(payload)
            .fetch_one(pool)
            .await
    }

    /// Find the annotation submitted for a video.
    pub async fn find_by_video(
        pool: &PgPool,
        video_id: DbId,
    ) -> Result<Option<Annotation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM annotations WHERE video_id = $1");
        sqlx::query_as::<_, Annotation>(&query)
            .bind(video_id)
            .fetch_optional(pool)
            .await
    }

    /// Total number of stored annotations.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM annotations")
            .fetch_one(pool)
            .await
    }
}
