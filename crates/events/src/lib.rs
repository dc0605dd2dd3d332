//! Annotator event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the canonical domain event envelope.
//! - [`CatalogProgress`]: payload of the `catalog.progress` event pushed to
//!   progress-bar clients.

pub mod bus;
pub mod progress;

pub use bus::{EventBus, PlatformEvent};
pub use progress::{CatalogProgress, EVENT_CATALOG_PROGRESS};
