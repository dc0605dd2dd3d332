//! Repository tests against a real PostgreSQL database.

use annotator_core::video_status::VideoStatus;
use annotator_db::models::video::CreateVideo;
use annotator_db::repositories::{AnnotationRepo, VideoRepo};
use assert_matches::assert_matches;
use sqlx::PgPool;

async fn seed(pool: &PgPool, name: &str) -> i64 {
    VideoRepo::create(
        pool,
        &CreateVideo {
            title: format!("Clip {name}"),
            filename: format!("{name}.mp4"),
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Test: new videos start Available without a lease
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn created_video_is_available(pool: PgPool) {
    let id = seed(&pool, "a").await;
    let video = VideoRepo::find_by_id(&pool, id).await.unwrap().unwrap();

    assert_eq!(video.status(), Some(VideoStatus::Available));
    assert!(video.lease_expires_at.is_none());
}

// ---------------------------------------------------------------------------
// Test: compare-and-set only applies from the expected status
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn compare_and_set_requires_expected_status(pool: PgPool) {
    let id = seed(&pool, "a").await;
    let expires = chrono::Utc::now() + chrono::Duration::minutes(5);

    let reserved = VideoRepo::compare_and_set_status(
        &pool,
        id,
        VideoStatus::Available,
        VideoStatus::Pending,
        Some(expires),
    )
    .await
    .unwrap();
    assert!(reserved);

    // Second reservation loses: the row is no longer Available.
    let again = VideoRepo::compare_and_set_status(
        &pool,
        id,
        VideoStatus::Available,
        VideoStatus::Pending,
        Some(expires),
    )
    .await
    .unwrap();
    assert!(!again);

    let video = VideoRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(video.status(), Some(VideoStatus::Pending));
    assert!(video.lease_expires_at.is_some());
}

// ---------------------------------------------------------------------------
// Test: racing reservations on one row have exactly one winner
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_reservations_of_one_row_have_one_winner(pool: PgPool) {
    let id = seed(&pool, "contended").await;
    let expires = chrono::Utc::now() + chrono::Duration::minutes(5);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let pool = pool.clone();
        tasks.spawn(async move {
            VideoRepo::compare_and_set_status(
                &pool,
                id,
                VideoStatus::Available,
                VideoStatus::Pending,
                Some(expires),
            )
            .await
            .unwrap()
        });
    }

    let mut wins = 0;
    while let Some(won) = tasks.join_next().await {
        if won.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);

    let video = VideoRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(video.status(), Some(VideoStatus::Pending));
}

// ---------------------------------------------------------------------------
// Test: leaving Pending clears the stored lease expiry
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn leaving_pending_clears_lease_expiry(pool: PgPool) {
    let id = seed(&pool, "a").await;
    let expires = chrono::Utc::now() + chrono::Duration::minutes(5);
    VideoRepo::compare_and_set_status(
        &pool,
        id,
        VideoStatus::Available,
        VideoStatus::Pending,
        Some(expires),
    )
    .await
    .unwrap();

    // A stray expiry on a non-Pending target must be ignored.
    let finalized = VideoRepo::compare_and_set_status(
        &pool,
        id,
        VideoStatus::Pending,
        VideoStatus::Annotated,
        Some(expires),
    )
    .await
    .unwrap();
    assert!(finalized);

    let video = VideoRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(video.status(), Some(VideoStatus::Annotated));
    assert!(video.lease_expires_at.is_none());
}

// ---------------------------------------------------------------------------
// Test: unknown ids never match
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn compare_and_set_on_unknown_id_is_false(pool: PgPool) {
    let changed = VideoRepo::compare_and_set_status(
        &pool,
        999_999,
        VideoStatus::Available,
        VideoStatus::Pending,
        None,
    )
    .await
    .unwrap();
    assert!(!changed);
    assert!(VideoRepo::find_by_id(&pool, 999_999).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Test: status listing and counts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_and_count_by_status(pool: PgPool) {
    let a = seed(&pool, "a").await;
    let b = seed(&pool, "b").await;
    let c = seed(&pool, "c").await;

    VideoRepo::compare_and_set_status(&pool, b, VideoStatus::Available, VideoStatus::Pending, None)
        .await
        .unwrap();
    VideoRepo::compare_and_set_status(&pool, c, VideoStatus::Available, VideoStatus::Annotated, None)
        .await
        .unwrap();

    let available = VideoRepo::list_by_status(&pool, VideoStatus::Available)
        .await
        .unwrap();
    assert_eq!(available.iter().map(|v| v.id).collect::<Vec<_>>(), vec![a]);

    let counts = VideoRepo::status_counts(&pool).await.unwrap();
    assert_eq!(counts.available, 1);
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.annotated, 1);
    assert_eq!(counts.total(), 3);
}

// ---------------------------------------------------------------------------
// Test: one annotation per video
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_annotation_for_video_violates_unique_constraint(pool: PgPool) {
    let id = seed(&pool, "a").await;
    let payload = serde_json::json!({"finding": "normal"});

    let first = AnnotationRepo::create(&pool, id, "reviewer-1", &payload)
        .await
        .unwrap();
    assert_eq!(first.video_id, id);
    assert_eq!(first.client_id, "reviewer-1");

    let second = AnnotationRepo::create(&pool, id, "reviewer-2", &payload).await;
    assert_matches!(second, Err(sqlx::Error::Database(ref e)) if e.constraint() == Some("uq_annotations_video_id"));

    assert_eq!(AnnotationRepo::count(&pool).await.unwrap(), 1);
    let stored = AnnotationRepo::find_by_video(&pool, id).await.unwrap().unwrap();
    assert_eq!(stored.payload["finding"], "normal");
}
