//! Cursor transitions.
//!
//! `step` runs the action under an invocation's cursor once and derives the
//! next persisted state from the result:
//!
//! - `Done` with a target moves the cursor to that action, starting `now`.
//! - `Done` without a target follows the first `continue` edge leaving the
//!   action. Without one, or when the action is an `exit`, the invocation
//!   finishes.
//! - `Pending` leaves the cursor untouched; the caller re-invokes no earlier
//!   than `scheduled_at`.
//!
//! The input invocation is never mutated. A failed step yields no new state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use flowstep_types::flow::{Action, ActionType, Flow};
use flowstep_types::invocation::{CurrentAction, FlowEvent, Invocation, InvocationState, RunResult};
use serde::{Deserialize, Serialize};

use crate::filter::FilterEvaluator;
use crate::navigation;
use crate::runner::{RunError, RunnerRegistry};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("invalid invocation state: {0}")]
    InvalidState(String),

    #[error("current action '{0}' not found in flow")]
    ActionNotFound(String),

    #[error(transparent)]
    Run(#[from] RunError),
}

/// Where the invocation stands after a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepStatus {
    /// The cursor moved to a new action, which can run right away.
    Advanced,
    /// The cursor stays put until `scheduled_at`.
    Waiting { scheduled_at: DateTime<Utc> },
    /// No action is left to run.
    Finished,
}

/// The result of one step together with the state to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// The action that ran.
    pub action_id: String,
    pub result: RunResult,
    pub next_state: InvocationState,
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn is_finished(&self) -> bool {
        self.status == StepStatus::Finished
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Create an invocation positioned on the flow's entry action.
///
/// The entry is the `trigger` action, or the first action in id order when
/// the flow has none.
pub fn start(
    flow: Arc<Flow>,
    event: Option<FlowEvent>,
    now: DateTime<Utc>,
) -> Result<Invocation, StepError> {
    let entry = navigation::find_action_by_type(&flow, ActionType::Trigger)
        .or_else(|| flow.actions.values().next())
        .ok_or_else(|| StepError::InvalidState(format!("flow '{}' has no actions", flow.name)))?;

    let state = InvocationState {
        current_action: Some(CurrentAction::started(entry.id.clone(), now)),
        event,
    };
    let invocation = Invocation::new(Arc::clone(&flow), state);
    tracing::debug!(
        invocation_id = %invocation.id,
        flow = %flow.name,
        entry = %entry.id,
        "invocation started"
    );
    Ok(invocation)
}

/// Run the current action once and compute the next state.
pub fn step<E: FilterEvaluator>(
    registry: &RunnerRegistry<E>,
    invocation: &Invocation,
    now: DateTime<Utc>,
) -> Result<StepOutcome, StepError> {
    let cursor = invocation
        .current_action()
        .ok_or_else(|| StepError::InvalidState("invocation has no current action".to_string()))?;
    let action = navigation::find_action_by_id(&invocation.flow, &cursor.id)
        .ok_or_else(|| StepError::ActionNotFound(cursor.id.clone()))?;

    let result = registry.run(invocation, action, now)?;
    let (next_state, status) = transition(&invocation.flow, action, &result, &invocation.state, now);

    tracing::debug!(
        invocation_id = %invocation.id,
        action_id = %action.id,
        next = next_state.current_action.as_ref().map(|c| c.id.as_str()).unwrap_or("-"),
        status = ?status,
        "step complete"
    );

    Ok(StepOutcome {
        action_id: action.id.clone(),
        result,
        next_state,
        status,
    })
}

/// Derive the next state from the result of running `action`.
pub fn transition(
    flow: &Flow,
    action: &Action,
    result: &RunResult,
    state: &InvocationState,
    now: DateTime<Utc>,
) -> (InvocationState, StepStatus) {
    let next_id = match result {
        RunResult::Pending { scheduled_at } => {
            return (
                state.clone(),
                StepStatus::Waiting {
                    scheduled_at: *scheduled_at,
                },
            );
        }
        RunResult::Done {
            go_to_action: Some(target),
        } => Some(target.id.clone()),
        RunResult::Done { go_to_action: None } if action.action_type() == ActionType::Exit => None,
        RunResult::Done { go_to_action: None } => {
            navigation::find_continue_edge(flow, &action.id).map(|edge| edge.to.clone())
        }
    };

    match next_id {
        Some(id) => (
            InvocationState {
                current_action: Some(CurrentAction::started(id, now)),
                event: state.event.clone(),
            },
            StepStatus::Advanced,
        ),
        None => (
            InvocationState {
                current_action: None,
                event: state.event.clone(),
            },
            StepStatus::Finished,
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
