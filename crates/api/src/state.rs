use std::sync::Arc;

use annotator_scheduler::{
    AllocationScheduler, PgAnnotationStore, PgVideoCatalog, SchedulerConfig,
};

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: annotator_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Lease-based video allocator.
    pub scheduler: Arc<AllocationScheduler>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Centralized event bus; progress updates flow through it.
    pub event_bus: Arc<annotator_events::EventBus>,
}

impl AppState {
    /// Wire the Postgres-backed scheduler onto `pool` and assemble the state.
    pub fn new(
        pool: annotator_db::DbPool,
        config: ServerConfig,
        scheduler_config: SchedulerConfig,
    ) -> Self {
        let event_bus = Arc::new(annotator_events::EventBus::default());
        let scheduler = Arc::new(AllocationScheduler::new(
            Arc::new(PgVideoCatalog::new(pool.clone())),
            Arc::new(PgAnnotationStore::new(pool.clone())),
            Arc::clone(&event_bus),
            scheduler_config,
        ));

        Self {
            pool,
            config: Arc::new(config),
            scheduler,
            ws_manager: Arc::new(WsManager::new()),
            event_bus,
        }
    }
}
