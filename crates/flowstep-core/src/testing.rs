//! Shared fixtures for unit tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use flowstep_types::flow::{Action, Edge, Flow};
use flowstep_types::invocation::{CurrentAction, FlowEvent, Invocation, InvocationState};
use serde_json::Value;

use crate::filter::{FilterError, FilterEvaluator};

/// 2025-01-01T00:00:00Z, the clock every runner test reads.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub fn build_flow(actions: Vec<Action>, edges: Vec<Edge>) -> Flow {
    Flow {
        id: Default::default(),
        name: "test-flow".to_string(),
        version: 1,
        actions: actions
            .into_iter()
            .map(|action| (action.id.clone(), action))
            .collect::<BTreeMap<_, _>>(),
        edges,
    }
}

/// An invocation positioned on `action_id`, started at `started_at`.
pub fn invocation_at(
    flow: Flow,
    action_id: &str,
    started_at: DateTime<Utc>,
    event: Option<FlowEvent>,
) -> Invocation {
    Invocation::new(
        Arc::new(flow),
        InvocationState {
            current_action: Some(CurrentAction::started(action_id, started_at)),
            event,
        },
    )
}

/// Matches when the filter payload equals the event name.
pub struct EventNameEvaluator;

impl FilterEvaluator for EventNameEvaluator {
    fn matches(&self, filters: &Value, event: Option<&FlowEvent>) -> Result<bool, FilterError> {
        Ok(matches!((filters, event), (Value::String(name), Some(event)) if *name == event.event))
    }
}

/// Always fails, to check that evaluator errors propagate.
pub struct FailingEvaluator;

impl FilterEvaluator for FailingEvaluator {
    fn matches(&self, _filters: &Value, _event: Option<&FlowEvent>) -> Result<bool, FilterError> {
        Err(FilterError::EvalFailed("evaluator offline".to_string()))
    }
}
