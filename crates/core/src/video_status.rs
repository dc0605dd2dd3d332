//! Video lifecycle states and the allowed transitions between them.
//!
//! ```text
//! Available --reserve--> Pending --finalize--> Annotated
//!     ^                     |
//!     +------release--------+
//! ```
//!
//! `Annotated` is terminal. The IDs match the `video_statuses` seed data
//! (1-based SMALLINT).

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Lifecycle status of a single video.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Available = 1,
    Pending = 2,
    Annotated = 3,
}

impl VideoStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Resolve a database status ID, `None` for unknown IDs.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Available),
            2 => Some(Self::Pending),
            3 => Some(Self::Annotated),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Pending => "pending",
            Self::Annotated => "annotated",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Annotated)
    }

    /// Target statuses reachable from `self`.
    ///
    /// `Available -> Annotated` is listed because finalize tolerates a lease
    /// that already expired (see [`FinalizePolicy`](crate::lease_policy::FinalizePolicy)).
    pub fn valid_transitions(self) -> &'static [VideoStatus] {
        match self {
            Self::Available => &[Self::Pending, Self::Annotated],
            Self::Pending => &[Self::Available, Self::Annotated],
            Self::Annotated => &[],
        }
    }

    pub fn can_transition(self, to: VideoStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(self, to: VideoStatus) -> Result<(), String> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(format!(
                "Invalid transition: {} -> {}",
                self.as_str(),
                to.as_str()
            ))
        }
    }
}

impl From<VideoStatus> for StatusId {
    fn from(value: VideoStatus) -> Self {
        value as StatusId
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
