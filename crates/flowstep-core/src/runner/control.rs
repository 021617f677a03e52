//! `trigger` and `exit` actions. Both complete on their first run; what
//! happens next is decided by the cursor transition.

use chrono::{DateTime, Utc};
use flowstep_types::flow::{Action, ActionConfig, ActionType};
use flowstep_types::invocation::{Invocation, RunResult};

use super::{ActionRunner, ConfigurationError, RunError};

/// Entry point of a flow.
pub struct TriggerRunner;

impl ActionRunner for TriggerRunner {
    fn run(
        &self,
        invocation: &Invocation,
        action: &Action,
        _now: DateTime<Utc>,
    ) -> Result<RunResult, RunError> {
        if !matches!(action.config, ActionConfig::Trigger) {
            return Err(ConfigurationError::unsupported(action, ActionType::Trigger).into());
        }
        tracing::debug!(invocation_id = %invocation.id, action_id = %action.id, "trigger passed");
        Ok(RunResult::done())
    }
}

/// Terminal action.
pub struct ExitRunner;

impl ActionRunner for ExitRunner {
    fn run(
        &self,
        invocation: &Invocation,
        action: &Action,
        _now: DateTime<Utc>,
    ) -> Result<RunResult, RunError> {
        if !matches!(action.config, ActionConfig::Exit) {
            return Err(ConfigurationError::unsupported(action, ActionType::Exit).into());
        }
        tracing::debug!(invocation_id = %invocation.id, action_id = %action.id, "exit reached");
        Ok(RunResult::done())
    }
}
