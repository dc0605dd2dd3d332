#![allow(dead_code)]

use std::time::Duration;

use annotator_core::types::DbId;
use annotator_core::video_status::VideoStatus;
use annotator_db::models::video::CreateVideo;
use annotator_db::repositories::VideoRepo;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use annotator_api::config::ServerConfig;
use annotator_api::router::build_app_router;
use annotator_api::state::AppState;
use annotator_scheduler::SchedulerConfig;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".parse().unwrap()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
    }
}

/// Scheduler config used by the HTTP tests: a 20 second lease, strictness
/// as given.
pub fn test_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        lease_duration: Duration::from_secs(20),
        ..SchedulerConfig::default()
    }
}

/// Build the application state over `pool`.
pub fn build_test_state(pool: PgPool, scheduler_config: SchedulerConfig) -> AppState {
    AppState::new(pool, test_config(), scheduler_config)
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let state = build_test_state(pool, test_scheduler_config());
    build_app_router(state, &test_config())
}

/// Build the router around an existing state, so a test can reach the
/// scheduler behind it.
pub fn app_for(state: &AppState) -> Router {
    build_app_router(state.clone(), &test_config())
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert one video per entry in `statuses`, returning their IDs in order.
pub async fn seed_videos(pool: &PgPool, statuses: &[VideoStatus]) -> Vec<DbId> {
    let mut ids = Vec::with_capacity(statuses.len());
    for (i, status) in statuses.iter().enumerate() {
        let video = VideoRepo::create(
            pool,
            &CreateVideo {
                title: format!("Walk {i}"),
                filename: format!("walk_{i}.mp4"),
            },
        )
        .await
        .unwrap();

        if *status != VideoStatus::Available {
            let expires_at = (*status == VideoStatus::Pending)
                .then(|| chrono::Utc::now() + chrono::Duration::minutes(20));
            let moved = VideoRepo::compare_and_set_status(
                pool,
                video.id,
                VideoStatus::Available,
                *status,
                expires_at,
            )
            .await
            .unwrap();
            assert!(moved);
        }
        ids.push(video.id);
    }
    ids
}

pub async fn status_of(pool: &PgPool, id: DbId) -> VideoStatus {
    VideoRepo::find_by_id(pool, id)
        .await
        .unwrap()
        .and_then(|v| v.status())
        .unwrap()
}

pub fn payload() -> serde_json::Value {
    serde_json::json!({
        "gait_phase": "swing",
        "abnormality": true,
        "notes": "left foot drags"
    })
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_as(app: Router, uri: &str, client_id: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("x-client-id", client_id)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: String) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
