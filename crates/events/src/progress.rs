//! The `catalog.progress` event: annotated vs. total video counts.

use serde::{Deserialize, Serialize};

use crate::bus::PlatformEvent;

/// Event type published whenever a video becomes Annotated.
pub const EVENT_CATALOG_PROGRESS: &str = "catalog.progress";

/// Annotation progress across the whole catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProgress {
    pub annotated_count: i64,
    pub total_count: i64,
}

impl CatalogProgress {
    /// Wrap the counts in a [`PlatformEvent`].
    pub fn into_event(self) -> PlatformEvent {
        PlatformEvent::new(EVENT_CATALOG_PROGRESS).with_payload(serde_json::json!({
            "annotated_count": self.annotated_count,
            "total_count": self.total_count,
        }))
    }

    /// Read the counts back out of a `catalog.progress` event.
    ///
    /// Returns `None` for other event types or malformed payloads.
    pub fn from_event(event: &PlatformEvent) -> Option<Self> {
        if event.event_type != EVENT_CATALOG_PROGRESS {
            return None;
        }
        serde_json::from_value(event.payload.clone()).ok()
    }
}
