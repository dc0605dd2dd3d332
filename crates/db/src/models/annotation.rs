//! Annotation model.

use annotator_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `annotations` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Annotation {
    pub id: DbId,
    pub video_id: DbId,
    pub client_id: String,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
