//! `wait_until_condition` actions: re-check one condition until it matches
//! or `max_wait_duration` has elapsed since the action started.
//!
//! A match continues along the action's branch edge with index 0. Timing out
//! completes without a target, so the cursor falls through to the `continue`
//! edge.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use flowstep_types::flow::{Action, ActionConfig, ActionType};
use flowstep_types::invocation::{Invocation, RunResult};

use super::{ActionRunner, ConfigurationError, RunError, configured_duration};
use crate::filter::FilterEvaluator;
use crate::navigation;
use crate::time;

pub struct WaitUntilConditionRunner<E> {
    evaluator: Arc<E>,
    max_poll_interval: TimeDelta,
}

impl<E: FilterEvaluator> WaitUntilConditionRunner<E> {
    pub fn new(evaluator: Arc<E>, max_poll_interval: TimeDelta) -> Self {
        Self {
            evaluator,
            max_poll_interval,
        }
    }
}

impl<E: FilterEvaluator> ActionRunner for WaitUntilConditionRunner<E> {
    fn run(
        &self,
        invocation: &Invocation,
        action: &Action,
        now: DateTime<Utc>,
    ) -> Result<RunResult, RunError> {
        let ActionConfig::WaitUntilCondition {
            condition,
            max_wait_duration,
        } = &action.config
        else {
            return Err(ConfigurationError::unsupported(action, ActionType::WaitUntilCondition).into());
        };

        if self.evaluator.matches(&condition.filters, invocation.event())? {
            let target = navigation::resolve_branch_target(&invocation.flow, &action.id, 0)?;
            tracing::debug!(
                invocation_id = %invocation.id,
                action_id = %action.id,
                go_to = %target.id,
                "wait condition matched"
            );
            return Ok(RunResult::go_to(target.clone()));
        }

        let elapsed = time::elapsed(invocation.current_action(), now)?;
        let max_wait = configured_duration(action, max_wait_duration)?;
        let result = time::schedule(now, time::remaining(max_wait, elapsed), self.max_poll_interval)?;
        tracing::debug!(
            invocation_id = %invocation.id,
            action_id = %action.id,
            elapsed_secs = elapsed.num_seconds(),
            timed_out = result.is_done(),
            "wait condition not met"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EventNameEvaluator, build_flow, fixed_now, invocation_at};
    use flowstep_types::flow::{Condition, Edge};
    use flowstep_types::invocation::FlowEvent;
    use serde_json::json;

    fn run(event: &str, started_ago: TimeDelta, edges: Vec<Edge>) -> Result<RunResult, RunError> {
        let action = Action::new(
            "wait",
            ActionConfig::WaitUntilCondition {
                condition: Condition::new(json!("$identify")),
                max_wait_duration: "1h".to_string(),
            },
        );
        let flow = build_flow(
            vec![
                action.clone(),
                Action::new("matched", ActionConfig::Exit),
                Action::new("timed_out", ActionConfig::Exit),
            ],
            edges,
        );
        let invocation = invocation_at(flow, "wait", fixed_now() - started_ago, Some(FlowEvent::new(event)));
        WaitUntilConditionRunner::new(Arc::new(EventNameEvaluator), time::default_max_poll_interval())
            .run(&invocation, &action, fixed_now())
    }

    fn edges() -> Vec<Edge> {
        vec![
            Edge::continue_to("wait", "timed_out"),
            Edge::branch("wait", "matched", 0),
        ]
    }

    #[test]
    fn test_match_goes_to_branch_zero() {
        let result = run("$identify", TimeDelta::minutes(3), edges()).unwrap();
        assert_eq!(result.go_to_action().unwrap().id, "matched");
    }

    #[test]
    fn test_no_match_waits_capped() {
        let result = run("$pageview", TimeDelta::zero(), edges()).unwrap();
        assert_eq!(result, RunResult::pending(fixed_now() + TimeDelta::minutes(10)));

        let result = run("$pageview", TimeDelta::minutes(55), edges()).unwrap();
        assert_eq!(result, RunResult::pending(fixed_now() + TimeDelta::minutes(5)));
    }

    #[test]
    fn test_no_match_times_out() {
        let result = run("$pageview", TimeDelta::hours(1), edges()).unwrap();
        assert_eq!(result, RunResult::done());
    }

    #[test]
    fn test_match_without_branch_edge_is_configuration_error() {
        let err = run("$identify", TimeDelta::zero(), vec![Edge::continue_to("wait", "timed_out")]).unwrap_err();
        assert!(matches!(
            err,
            RunError::Configuration(ConfigurationError::BranchEdgeNotFound { index: 0, .. })
        ));
    }
}
