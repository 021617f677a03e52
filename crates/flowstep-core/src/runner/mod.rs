//! Action runners.
//!
//! An `ActionRunner` executes one action of an invocation once and reports
//! whether the action is done or must be re-invoked later. Runners are pure
//! with respect to the invocation: they read the cursor and the event, never
//! write them. Moving the cursor is the caller's job (see `crate::step`).
//!
//! `RunnerRegistry` dispatches on the action's configuration variant, one
//! handler per action type.

pub mod conditional_branch;
pub mod control;
pub mod delay;
pub mod wait_until_condition;

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use flowstep_types::config::{EngineConfig, MIN_POLL_INTERVAL_SECS};
use flowstep_types::flow::{Action, ActionType};
use flowstep_types::invocation::{Invocation, RunResult};

use crate::filter::{FilterError, FilterEvaluator, JexlFilterEvaluator};
use crate::time::{self, DurationError};

pub use conditional_branch::ConditionalBranchRunner;
pub use control::{ExitRunner, TriggerRunner};
pub use delay::DelayRunner;
pub use wait_until_condition::WaitUntilConditionRunner;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors a runner can fail with. A failed run leaves the invocation state
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The invocation state cannot support the computation.
    #[error("invalid invocation state: {0}")]
    InvalidState(String),

    /// The flow definition is broken.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The filter evaluator failed.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Defects in a flow definition, discovered while running it.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("action '{action_id}' has an invalid duration: {source}")]
    InvalidDuration {
        action_id: String,
        #[source]
        source: DurationError,
    },

    #[error("no branch edge from '{from}' with index {index}")]
    BranchEdgeNotFound { from: String, index: usize },

    #[error("action '{0}' not found in flow")]
    ActionNotFound(String),

    #[error("action '{action_id}' is a {found} action, expected {expected}")]
    UnsupportedConfig {
        action_id: String,
        expected: ActionType,
        found: ActionType,
    },
}

impl ConfigurationError {
    pub(crate) fn unsupported(action: &Action, expected: ActionType) -> Self {
        ConfigurationError::UnsupportedConfig {
            action_id: action.id.clone(),
            expected,
            found: action.action_type(),
        }
    }
}

/// Parse a duration from an action's configuration, blaming the action on failure.
pub(crate) fn configured_duration(action: &Action, value: &str) -> Result<TimeDelta, RunError> {
    time::parse_duration(value).map_err(|source| {
        RunError::from(ConfigurationError::InvalidDuration {
            action_id: action.id.clone(),
            source,
        })
    })
}

// ---------------------------------------------------------------------------
// ActionRunner
// ---------------------------------------------------------------------------

/// Executes one action type.
pub trait ActionRunner: Send + Sync {
    /// Run `action` for `invocation` once, as of `now`.
    fn run(
        &self,
        invocation: &Invocation,
        action: &Action,
        now: DateTime<Utc>,
    ) -> Result<RunResult, RunError>;
}

// ---------------------------------------------------------------------------
// RunnerRegistry
// ---------------------------------------------------------------------------

/// One runner per action type, sharing a filter evaluator and a poll cap.
pub struct RunnerRegistry<E> {
    trigger: TriggerRunner,
    delay: DelayRunner,
    conditional_branch: ConditionalBranchRunner<E>,
    wait_until_condition: WaitUntilConditionRunner<E>,
    exit: ExitRunner,
    max_poll_interval: TimeDelta,
}

impl<E: FilterEvaluator> RunnerRegistry<E> {
    /// Build the registry from engine configuration.
    pub fn new(evaluator: E, config: &EngineConfig) -> Self {
        Self::with_max_poll_interval(evaluator, config.max_poll_interval())
    }

    /// Build the registry with an explicit poll cap, raised to at least
    /// `MIN_POLL_INTERVAL_SECS`.
    pub fn with_max_poll_interval(evaluator: E, max_poll_interval: TimeDelta) -> Self {
        let floor = TimeDelta::seconds(MIN_POLL_INTERVAL_SECS as i64);
        let max_poll_interval = max_poll_interval.max(floor);
        let evaluator = Arc::new(evaluator);
        Self {
            trigger: TriggerRunner,
            delay: DelayRunner::new(max_poll_interval),
            conditional_branch: ConditionalBranchRunner::new(
                Arc::clone(&evaluator),
                max_poll_interval,
            ),
            wait_until_condition: WaitUntilConditionRunner::new(evaluator, max_poll_interval),
            exit: ExitRunner,
            max_poll_interval,
        }
    }

    pub fn max_poll_interval(&self) -> TimeDelta {
        self.max_poll_interval
    }

    /// The runner responsible for `action_type`.
    pub fn runner_for(&self, action_type: ActionType) -> &dyn ActionRunner {
        match action_type {
            ActionType::Trigger => &self.trigger,
            ActionType::Delay => &self.delay,
            ActionType::ConditionalBranch => &self.conditional_branch,
            ActionType::WaitUntilCondition => &self.wait_until_condition,
            ActionType::Exit => &self.exit,
        }
    }

    /// Run `action` with the runner matching its type.
    pub fn run(
        &self,
        invocation: &Invocation,
        action: &Action,
        now: DateTime<Utc>,
    ) -> Result<RunResult, RunError> {
        self.runner_for(action.action_type())
            .run(invocation, action, now)
    }
}

impl RunnerRegistry<JexlFilterEvaluator> {
    /// Registry backed by the bundled JEXL evaluator.
    pub fn jexl(config: &EngineConfig) -> Self {
        Self::new(JexlFilterEvaluator::new(), config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
