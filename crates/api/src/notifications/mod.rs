//! Event-to-WebSocket forwarding.
//!
//! [`ProgressBroadcaster`] subscribes to the event bus and pushes every
//! `catalog.progress` event to all connected browser clients.

use std::sync::Arc;

use annotator_events::{CatalogProgress, PlatformEvent};
use axum::extract::ws::Message;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::ws::WsManager;

/// Frame pushed to WebSocket clients after each completed annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub annotated_count: i64,
    pub total_count: i64,
}

impl From<CatalogProgress> for ProgressFrame {
    fn from(progress: CatalogProgress) -> Self {
        Self {
            kind: "progress",
            annotated_count: progress.annotated_count,
            total_count: progress.total_count,
        }
    }
}

/// Forwards progress events to WebSocket clients.
pub struct ProgressBroadcaster {
    ws_manager: Arc<WsManager>,
}

impl ProgressBroadcaster {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the forwarding loop.
    ///
    /// Exits when `cancel` fires or the event bus is dropped.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<PlatformEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Progress broadcaster cancelled");
                    break;
                }
                received = receiver.recv() => received,
            };

            match received {
                Ok(event) => {
                    self.forward(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Progress broadcaster lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, progress broadcaster shutting down");
                    break;
                }
            }
        }
    }

    /// Push one event to every connection. Returns the number of
    /// connections reached; non-progress events reach none.
    pub async fn forward(&self, event: &PlatformEvent) -> usize {
        let Some(progress) = CatalogProgress::from_event(event) else {
            return 0;
        };

        let text = match serde_json::to_string(&ProgressFrame::from(progress)) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode progress frame");
                return 0;
            }
        };

        let sent = self.ws_manager.broadcast(Message::Text(text.into())).await;
        tracing::debug!(
            sent,
            annotated_count = progress.annotated_count,
            total_count = progress.total_count,
            "Progress pushed to WebSocket clients"
        );
        sent
    }
}
