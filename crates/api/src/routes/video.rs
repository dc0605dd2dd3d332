use axum::routing::{get, post};
use axum::Router;

use crate::handlers::video;
use crate::state::AppState;

/// Video allocation routes mounted at `/video`.
///
/// ```text
/// GET    /        -> allocate_video
/// POST   /{id}    -> submit_annotation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(video::allocate_video))
        .route("/{id}", post(video::submit_annotation))
}
