//! `delay` actions: wait a fixed duration measured from when the action started.

use chrono::{DateTime, TimeDelta, Utc};
use flowstep_types::flow::{Action, ActionConfig, ActionType};
use flowstep_types::invocation::{Invocation, RunResult};

use super::{ActionRunner, ConfigurationError, RunError, configured_duration};
use crate::time;

pub struct DelayRunner {
    max_poll_interval: TimeDelta,
}

impl DelayRunner {
    pub fn new(max_poll_interval: TimeDelta) -> Self {
        Self { max_poll_interval }
    }
}

impl Default for DelayRunner {
    fn default() -> Self {
        Self::new(time::default_max_poll_interval())
    }
}

impl ActionRunner for DelayRunner {
    fn run(
        &self,
        invocation: &Invocation,
        action: &Action,
        now: DateTime<Utc>,
    ) -> Result<RunResult, RunError> {
        let ActionConfig::Delay { delay_duration } = &action.config else {
            return Err(ConfigurationError::unsupported(action, ActionType::Delay).into());
        };

        let elapsed = time::elapsed(invocation.current_action(), now)?;
        let target = configured_duration(action, delay_duration)?;
        let result = time::schedule(now, time::remaining(target, elapsed), self.max_poll_interval)?;

        tracing::debug!(
            invocation_id = %invocation.id,
            action_id = %action.id,
            elapsed_secs = elapsed.num_seconds(),
            done = result.is_done(),
            "delay checked"
        );
        Ok(result)
    }
}
