//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! The scheduler publishes; the WebSocket broadcaster (and tests) subscribe.
//! Nothing is persisted: a subscriber that falls more than the channel
//! capacity behind sees `RecvError::Lagged` and skips ahead.

use annotator_core::types::{DbId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the broadcast channel behind [`EventBus::default`].
pub const DEFAULT_CAPACITY: usize = 256;

/// Something that happened to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated name, e.g. `"catalog.progress"`.
    pub event_type: String,
    /// The video whose transition triggered the event.
    pub video_id: Option<DbId>,
    /// Client id of the caller that caused it.
    pub actor: Option<String>,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            video_id: None,
            actor: None,
            payload: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    pub fn with_video(mut self, video_id: DbId) -> Self {
        self.video_id = Some(video_id);
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Fan-out of [`PlatformEvent`]s to every live subscriber.
///
/// Share it as `Arc<EventBus>`.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to current subscribers and return how many there were.
    ///
    /// With none, the event is dropped.
    pub fn publish(&self, event: PlatformEvent) -> usize {
        let event_type = event.event_type.clone();
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::trace!(event_type = %event_type, receivers, "Event published");
        receivers
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_video_and_actor() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let sent = bus.publish(
            PlatformEvent::new("catalog.progress")
                .with_video(42)
                .with_actor("reviewer-7")
                .with_payload(serde_json::json!({"annotated_count": 1})),
        );
        assert_eq!(sent, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.video_id, Some(42));
        assert_eq!(received.actor.as_deref(), Some("reviewer-7"));
        assert_eq!(received.payload["annotated_count"], 1);
    }

    #[tokio::test]
    async fn every_subscriber_gets_a_copy() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.publish(PlatformEvent::new("catalog.progress")), 2);
        assert_eq!(rx1.recv().await.unwrap(), rx2.recv().await.unwrap());
    }

    #[test]
    fn publishing_without_subscribers_reaches_nobody() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(PlatformEvent::new("catalog.progress")), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_lags_past_capacity() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for _ in 0..3 {
            bus.publish(PlatformEvent::new("catalog.progress"));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
    }
}
