use axum::routing::get;
use axum::Router;

use crate::handlers::progress;
use crate::state::AppState;

/// ```text
/// GET    /progress   -> get_progress
/// GET    /leases     -> list_leases
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/progress", get(progress::get_progress))
        .route("/leases", get(progress::list_leases))
}
