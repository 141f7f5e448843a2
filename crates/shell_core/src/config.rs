use std::time::Duration;

use crate::OriginList;

/// Per-attempt timeout used when the host does not supply one.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(15);
/// Advisory ceiling for a whole session.
pub const DEFAULT_TOTAL_BUDGET: Duration = Duration::from_secs(45);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub origins: OriginList,
    pub attempt_timeout: Duration,
    /// Logged when exceeded, never enforced by aborting an attempt.
    pub total_budget: Duration,
}

impl LoaderConfig {
    pub fn new(origins: OriginList) -> Self {
        Self {
            origins,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            total_budget: DEFAULT_TOTAL_BUDGET,
        }
    }

    /// Upper bound on session length when every attempt runs into its timer.
    pub fn worst_case(&self) -> Duration {
        self.attempt_timeout
            .saturating_mul(u32::try_from(self.origins.len()).unwrap_or(u32::MAX))
    }
}
