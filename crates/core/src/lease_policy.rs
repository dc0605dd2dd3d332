//! Lease constants and the finalize policy.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::video_status::VideoStatus;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default time a reserved video stays Pending before it is released.
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 20 * 60;

/// Default number of reselections `allocate` makes after losing a race.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Attempts `finalize` makes when its conditional update keeps losing races.
pub const FINALIZE_MAX_ATTEMPTS: u32 = 4;

// ---------------------------------------------------------------------------
// Finalize policy
// ---------------------------------------------------------------------------

/// Which source statuses a completion may finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizePolicy {
    /// Pending or Available. A client whose lease expired a moment before
    /// submitting still gets its annotation accepted.
    #[default]
    Lenient,
    /// Pending only.
    Strict,
}

impl FinalizePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lenient => "lenient",
            Self::Strict => "strict",
        }
    }

    /// Parse a policy from a string slice (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(CoreError::Validation(format!(
                "Invalid finalize policy '{other}'. Must be one of: lenient, strict"
            ))),
        }
    }

    /// Whether a video currently in `status` may be finalized.
    pub fn accepts(self, status: VideoStatus) -> bool {
        match (self, status) {
            (_, VideoStatus::Pending) => true,
            (Self::Lenient, VideoStatus::Available) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_lenient() {
        assert_eq!(FinalizePolicy::default(), FinalizePolicy::Lenient);
    }

    #[test]
    fn parse_accepts_mixed_case() {
        assert_eq!(FinalizePolicy::parse("Strict").unwrap(), FinalizePolicy::Strict);
        assert_eq!(FinalizePolicy::parse(" lenient ").unwrap(), FinalizePolicy::Lenient);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(matches!(
            FinalizePolicy::parse("loose"),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn lenient_accepts_available_and_pending() {
        let p = FinalizePolicy::Lenient;
        assert!(p.accepts(VideoStatus::Pending));
        assert!(p.accepts(VideoStatus::Available));
        assert!(!p.accepts(VideoStatus::Annotated));
    }

    #[test]
    fn strict_accepts_pending_only() {
        let p = FinalizePolicy::Strict;
        assert!(p.accepts(VideoStatus::Pending));
        assert!(!p.accepts(VideoStatus::Available));
        assert!(!p.accepts(VideoStatus::Annotated));
    }
}
