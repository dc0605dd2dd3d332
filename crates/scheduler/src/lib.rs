//! Video allocation scheduler.
//!
//! Hands an unannotated video to a requesting client, reserves it under a
//! timed lease, and either finalizes it when the annotation arrives or
//! releases it when the lease expires.
//!
//! - [`catalog`]: the [`VideoCatalog`] seam and its shared race semantics.
//! - [`annotation_store`]: where submitted payloads are written.
//! - [`pg`] / [`memory`]: PostgreSQL and in-process implementations.
//! - [`lease`]: the in-memory [`LeaseTable`] of armed expiry timers.
//! - [`scheduler`]: [`AllocationScheduler`], the lease protocol itself.

pub mod annotation_store;
pub mod catalog;
pub mod config;
pub mod lease;
pub mod memory;
pub mod pg;
pub mod scheduler;

pub use annotation_store::AnnotationStore;
pub use catalog::{FinalizeOutcome, VideoCatalog};
pub use config::SchedulerConfig;
pub use lease::{LeaseInfo, LeaseTable};
pub use memory::{MemoryAnnotationStore, MemoryCatalog};
pub use pg::{PgAnnotationStore, PgVideoCatalog};
pub use scheduler::{AllocationScheduler, CompletionReceipt, RecoveryReport};
