//! Engine configuration types for Flowstep.
//!
//! `EngineConfig` represents the `config.toml` that tunes engine-wide
//! behavior. All fields have defaults matching the reference behavior.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Default maximum interval between two checks of a waiting action (10 minutes).
pub const DEFAULT_MAX_POLL_INTERVAL_SECS: u64 = 600;

/// Smallest usable poll cap. A zero cap would schedule every re-check at
/// `now` and the invocation would never progress.
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

/// Engine-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound, in seconds, on any single scheduled wait.
    ///
    /// Long waits are split into many checks no further apart than this.
    #[serde(default = "default_max_poll_interval_secs")]
    pub max_poll_interval_secs: u64,
}

fn default_max_poll_interval_secs() -> u64 {
    DEFAULT_MAX_POLL_INTERVAL_SECS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_poll_interval_secs: default_max_poll_interval_secs(),
        }
    }
}

impl EngineConfig {
    /// The poll cap as a duration, raised to `MIN_POLL_INTERVAL_SECS`.
    /// Saturates for absurdly large values.
    pub fn max_poll_interval(&self) -> TimeDelta {
        i64::try_from(self.max_poll_interval_secs.max(MIN_POLL_INTERVAL_SECS))
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }
}
