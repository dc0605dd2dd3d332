//! Shared domain types for the video annotation allocator.
//!
//! This crate has zero internal dependencies so it can be used by the
//! repository layer, the scheduler, and the HTTP server alike.

pub mod annotation;
pub mod error;
pub mod lease_policy;
pub mod selection;
pub mod types;
pub mod video_status;
