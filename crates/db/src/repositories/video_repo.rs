//! Repository for the `videos` table.
//!
//! Every status change goes through [`VideoRepo::compare_and_set_status`],
//! a single conditional `UPDATE`. Reservation, release, and finalization
//! all race through that one statement.

use annotator_core::types::{DbId, Timestamp};
use annotator_core::video_status::VideoStatus;
use sqlx::PgPool;

use crate::models::video::{CreateVideo, StatusCounts, Video};

/// Column list for `videos` queries.
const COLUMNS: &str = "\
    id, title, filename, status_id, lease_expires_at, created_at, updated_at";

/// Provides catalog operations for videos.
pub struct VideoRepo;

impl VideoRepo {
    /// Register a new video. It starts Available.
    pub async fn create(pool: &PgPool, input: &CreateVideo) -> Result<Video, sqlx::Error> {
        let query = format!(
            "INSERT INTO videos (title, filename, status_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(&input.title)
            .bind(&input.filename)
            .bind(VideoStatus::Available.id())
            .fetch_one(pool)
            .await
    }

    /// Find a video by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every video currently in `status`, ordered by ID.
    pub async fn list_by_status(
        pool: &PgPool,
        status: VideoStatus,
    ) -> Result<Vec<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE status_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, Video>(&query)
            .bind(status.id())
            .fetch_all(pool)
            .await
    }

    /// Count videos per status in one pass.
    pub async fn status_counts(pool: &PgPool) -> Result<StatusCounts, sqlx::Error> {
        sqlx::query_as::<_, StatusCounts>(
            "SELECT \
                 COUNT(*) FILTER (WHERE status_id = $1) AS available, \
                 COUNT(*) FILTER (WHERE status_id = $2) AS pending, \
                 COUNT(*) FILTER (WHERE status_id = $3) AS annotated \
             FROM videos",
        )
        .bind(VideoStatus::Available.id())
        .bind(VideoStatus::Pending.id())
        .bind(VideoStatus::Annotated.id())
        .fetch_one(pool)
        .await
    }

    /// Atomically move a video from `expected` to `next`.
    ///
    /// Returns `true` if the row changed, `false` if the video was not in
    /// `expected` (or does not exist). `lease_expires_at` is stored only when
    /// `next` is Pending and cleared otherwise.
    pub async fn compare_and_set_status(
        pool: &PgPool,
        id: DbId,
        expected: VideoStatus,
        next: VideoStatus,
        lease_expires_at: Option<Timestamp>,
    ) -> Result<bool, sqlx::Error> {
        let lease_expires_at = match next {
            VideoStatus::Pending => lease_expires_at,
            _ => None,
        };
        let result = sqlx::query(
            "UPDATE videos \
             SET status_id = $3, lease_expires_at = $4 \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(id)
        .bind(expected.id())
        .bind(next.id())
        .bind(lease_expires_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
