pub mod health;
pub mod progress;
pub mod video;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                 WebSocket (progress pushes)
///
/// /video              allocate (GET)
/// /video/{id}         submit annotation (POST)
///
/// /progress           annotated vs. total (GET)
/// /leases             live leases (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/video", video::router())
        .merge(progress::router())
}
