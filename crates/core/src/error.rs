use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// No video is available right now, but some are leased to other clients.
    #[error("All remaining videos are currently reserved")]
    AllPending,

    /// Every video in the catalog has been annotated.
    #[error("All videos have been annotated")]
    Exhausted,

    /// The annotation payload could not be stored after the video was finalized.
    #[error("Annotation persistence failed: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::AllPending)
    }
}
