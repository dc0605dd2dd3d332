use std::str::FromStr;
use std::time::Duration;

use annotator_core::error::CoreError;
use annotator_core::lease_policy::{
    FinalizePolicy, DEFAULT_LEASE_DURATION_SECS, DEFAULT_RETRY_BUDGET,
};

/// Scheduler configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long a reserved video stays Pending without a submission.
    pub lease_duration: Duration,
    /// Reselections `allocate` makes after losing a reservation race.
    pub retry_budget: u32,
    /// Which statuses a completion may finalize.
    pub finalize_policy: FinalizePolicy,
    /// Re-arm timers for Pending videos found at startup.
    pub recover_leases: bool,
    /// Release every leased video during graceful shutdown.
    pub release_on_shutdown: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lease_duration: Duration::from_secs(DEFAULT_LEASE_DURATION_SECS),
            retry_budget: DEFAULT_RETRY_BUDGET,
            finalize_policy: FinalizePolicy::default(),
            recover_leases: true,
            release_on_shutdown: true,
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default   |
    /// |--------------------------|-----------|
    /// | `LEASE_DURATION_SECS`    | `1200`    |
    /// | `ALLOCATE_RETRY_BUDGET`  | `3`       |
    /// | `FINALIZE_POLICY`        | `lenient` |
    /// | `LEASE_RECOVERY_ENABLED` | `true`    |
    /// | `RELEASE_ON_SHUTDOWN`    | `true`    |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lease_secs: u64 = parse_var(&lookup, "LEASE_DURATION_SECS", DEFAULT_LEASE_DURATION_SECS)?;
        if lease_secs == 0 {
            return Err(CoreError::Validation(
                "LEASE_DURATION_SECS must be greater than zero".to_string(),
            ));
        }

        let finalize_policy = match lookup("FINALIZE_POLICY") {
            Some(raw) => FinalizePolicy::parse(&raw)?,
            None => FinalizePolicy::default(),
        };

        Ok(Self {
            lease_duration: Duration::from_secs(lease_secs),
            retry_budget: parse_var(&lookup, "ALLOCATE_RETRY_BUDGET", DEFAULT_RETRY_BUDGET)?,
            finalize_policy,
            recover_leases: parse_bool(&lookup, "LEASE_RECOVERY_ENABLED", true)?,
            release_on_shutdown: parse_bool(&lookup, "RELEASE_ON_SHUTDOWN", true)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{name} has invalid value '{raw}'"))),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, name: &str, default: bool) -> Result<bool, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(CoreError::Validation(format!(
            "{name} must be a boolean, got '{v}'"
        ))),
    }
}
