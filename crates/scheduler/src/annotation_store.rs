use annotator_core::error::CoreError;
use annotator_core::types::DbId;
use async_trait::async_trait;

/// Destination for submitted annotation payloads.
///
/// Failures must be reported as [`CoreError::Persistence`]; the scheduler
/// does not roll back the catalog when a write fails.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Store `payload` for `video_id` and return the new record's id.
    async fn save(
        &self,
        video_id: DbId,
        client_id: &str,
        payload: &serde_json::Value,
    ) -> Result<DbId, CoreError>;
}
