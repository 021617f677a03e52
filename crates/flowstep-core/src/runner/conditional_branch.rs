//! `conditional_branch` actions.
//!
//! Conditions are evaluated in declared order on every run; the first match
//! wins and resolves to the `branch` edge carrying its position. Without a
//! match the action either completes at once (no `delay_duration`, or a zero
//! one) or keeps re-checking until the duration measured from the action's
//! start has elapsed.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use flowstep_types::flow::{Action, ActionConfig, ActionType, Condition};
use flowstep_types::invocation::{Invocation, RunResult};

use super::{ActionRunner, ConfigurationError, RunError, configured_duration};
use crate::filter::FilterEvaluator;
use crate::navigation;
use crate::time;

pub struct ConditionalBranchRunner<E> {
    evaluator: Arc<E>,
    max_poll_interval: TimeDelta,
}

impl<E: FilterEvaluator> ConditionalBranchRunner<E> {
    pub fn new(evaluator: Arc<E>, max_poll_interval: TimeDelta) -> Self {
        Self {
            evaluator,
            max_poll_interval,
        }
    }

    /// Position of the first condition matching the invocation's event.
    fn first_match(
        &self,
        conditions: &[Condition],
        invocation: &Invocation,
    ) -> Result<Option<usize>, RunError> {
        for (index, condition) in conditions.iter().enumerate() {
            if self.evaluator.matches(&condition.filters, invocation.event())? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

impl<E: FilterEvaluator> ActionRunner for ConditionalBranchRunner<E> {
    fn run(
        &self,
        invocation: &Invocation,
        action: &Action,
        now: DateTime<Utc>,
    ) -> Result<RunResult, RunError> {
        let ActionConfig::ConditionalBranch {
            conditions,
            delay_duration,
        } = &action.config
        else {
            return Err(ConfigurationError::unsupported(action, ActionType::ConditionalBranch).into());
        };

        if let Some(index) = self.first_match(conditions, invocation)? {
            let target = navigation::resolve_branch_target(&invocation.flow, &action.id, index)?;
            tracing::debug!(
                invocation_id = %invocation.id,
                action_id = %action.id,
                condition = index,
                go_to = %target.id,
                "branch condition matched"
            );
            return Ok(RunResult::go_to(target.clone()));
        }

        let window = match delay_duration.as_deref().map(str::trim) {
            None | Some("") => TimeDelta::zero(),
            Some(value) => configured_duration(action, value)?,
        };
        if window <= TimeDelta::zero() {
            tracing::debug!(
                invocation_id = %invocation.id,
                action_id = %action.id,
                "no branch condition matched"
            );
            return Ok(RunResult::done());
        }

        let elapsed = time::elapsed(invocation.current_action(), now)?;
        let result = time::schedule(now, time::remaining(window, elapsed), self.max_poll_interval)?;
        tracing::debug!(
            invocation_id = %invocation.id,
            action_id = %action.id,
            elapsed_secs = elapsed.num_seconds(),
            gave_up = result.is_done(),
            "no branch condition matched yet"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::JexlFilterEvaluator;
    use crate::testing::{EventNameEvaluator, FailingEvaluator, build_flow, fixed_now, invocation_at};
    use flowstep_types::flow::{Edge, Flow};
    use flowstep_types::invocation::{FlowEvent, InvocationState};
    use serde_json::json;

    fn branch(delay_duration: Option<&str>) -> Action {
        Action::new(
            "branch",
            ActionConfig::ConditionalBranch {
                conditions: vec![
                    Condition::new(json!("$pageview")),
                    Condition::new(json!("$autocapture")),
                ],
                delay_duration: delay_duration.map(str::to_string),
            },
        )
    }

    fn flow(branch: Action, edges: Vec<Edge>) -> Flow {
        build_flow(
            vec![
                branch,
                Action::new("condition_1", ActionConfig::Exit),
                Action::new("condition_2", ActionConfig::Exit),
            ],
            edges,
        )
    }

    fn edges() -> Vec<Edge> {
        vec![
            Edge::branch("branch", "condition_1", 0),
            Edge::branch("branch", "condition_2", 1),
        ]
    }

    fn run_with<E: FilterEvaluator>(
        evaluator: E,
        action: Action,
        edges: Vec<Edge>,
        event: Option<FlowEvent>,
        started_ago: TimeDelta,
    ) -> Result<RunResult, RunError> {
        let invocation = invocation_at(flow(action.clone(), edges), "branch", fixed_now() - started_ago, event);
        ConditionalBranchRunner::new(Arc::new(evaluator), time::default_max_poll_interval())
            .run(&invocation, &action, fixed_now())
    }

    fn run(action: Action, event: &str, started_ago: TimeDelta) -> Result<RunResult, RunError> {
        run_with(EventNameEvaluator, action, edges(), Some(FlowEvent::new(event)), started_ago)
    }

    #[test]
    fn test_first_condition_match_goes_to_its_branch() {
        let result = run(branch(None), "$pageview", TimeDelta::zero()).unwrap();
        assert_eq!(result.go_to_action().unwrap().id, "condition_1");
    }

    #[test]
    fn test_second_condition_match_goes_to_its_branch() {
        let result = run(branch(None), "$autocapture", TimeDelta::zero()).unwrap();
        assert_eq!(result.go_to_action().unwrap().id, "condition_2");
    }

    #[test]
    fn test_edge_storage_order_is_irrelevant() {
        let mut reversed = edges();
        reversed.reverse();
        let result = run_with(
            EventNameEvaluator,
            branch(None),
            reversed,
            Some(FlowEvent::new("$pageview")),
            TimeDelta::zero(),
        )
        .unwrap();
        assert_eq!(result.go_to_action().unwrap().id, "condition_1");
    }

    #[test]
    fn test_declared_order_breaks_ties() {
        let action = Action::new(
            "branch",
            ActionConfig::ConditionalBranch {
                conditions: vec![
                    Condition::new(json!("event.event == '$pageview'")),
                    Condition::new(json!("event.event|startsWith('$')")),
                ],
                delay_duration: None,
            },
        );
        let result = run_with(
            JexlFilterEvaluator::new(),
            action,
            edges(),
            Some(FlowEvent::new("$pageview")),
            TimeDelta::zero(),
        )
        .unwrap();
        assert_eq!(result.go_to_action().unwrap().id, "condition_1");
    }

    #[test]
    fn test_no_match_without_delay_is_done() {
        assert_eq!(run(branch(None), "no-match", TimeDelta::zero()).unwrap(), RunResult::done());
        assert_eq!(run(branch(Some("0s")), "no-match", TimeDelta::zero()).unwrap(), RunResult::done());
    }

    #[test]
    fn test_no_match_without_delay_ignores_cursor() {
        let action = branch(None);
        let invocation = Invocation::new(
            Arc::new(flow(action.clone(), edges())),
            InvocationState {
                current_action: None,
                event: Some(FlowEvent::new("no-match")),
            },
        );
        let result = ConditionalBranchRunner::new(Arc::new(EventNameEvaluator), time::default_max_poll_interval())
            .run(&invocation, &action, fixed_now())
            .unwrap();
        assert_eq!(result, RunResult::done());
    }

    #[test]
    fn test_no_match_with_long_delay_is_capped() {
        let result = run(branch(Some("2h")), "no-match", TimeDelta::zero()).unwrap();
        assert_eq!(result, RunResult::pending(fixed_now() + TimeDelta::minutes(10)));
    }

    #[test]
    fn test_no_match_with_short_delay_waits_exactly() {
        let result = run(branch(Some("5m")), "no-match", TimeDelta::zero()).unwrap();
        assert_eq!(result, RunResult::pending(fixed_now() + TimeDelta::minutes(5)));
    }

    #[test]
    fn test_no_match_after_delay_gives_up() {
        let result = run(branch(Some("5m")), "no-match", TimeDelta::minutes(6)).unwrap();
        assert_eq!(result, RunResult::done());
    }

    #[test]
    fn test_no_match_with_delay_needs_cursor() {
        let action = branch(Some("300s"));
        let invocation = Invocation::new(
            Arc::new(flow(action.clone(), edges())),
            InvocationState {
                current_action: None,
                event: Some(FlowEvent::new("no-match")),
            },
        );
        let err = ConditionalBranchRunner::new(Arc::new(EventNameEvaluator), time::default_max_poll_interval())
            .run(&invocation, &action, fixed_now())
            .unwrap_err();
        assert!(matches!(err, RunError::InvalidState(_)));
        assert!(err.to_string().contains(time::STARTED_AT_INVALID));
    }

    #[test]
    fn test_match_during_wait_takes_branch() {
        let result = run(branch(Some("2h")), "$autocapture", TimeDelta::minutes(40)).unwrap();
        assert_eq!(result.go_to_action().unwrap().id, "condition_2");
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let first = run(branch(Some("2h")), "no-match", TimeDelta::minutes(30)).unwrap();
        let second = run(branch(Some("2h")), "no-match", TimeDelta::minutes(30)).unwrap();
        assert_eq!(first, second);

        let first = run(branch(None), "$pageview", TimeDelta::zero()).unwrap();
        let second = run(branch(None), "$pageview", TimeDelta::zero()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_branch_edge_is_configuration_error() {
        let err = run_with(
            EventNameEvaluator,
            branch(None),
            vec![Edge::branch("branch", "condition_1", 0)],
            Some(FlowEvent::new("$autocapture")),
            TimeDelta::zero(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RunError::Configuration(ConfigurationError::BranchEdgeNotFound { index: 1, .. })
        ));
    }

    #[test]
    fn test_evaluator_errors_propagate() {
        let err = run_with(
            FailingEvaluator,
            branch(Some("2h")),
            edges(),
            Some(FlowEvent::new("$pageview")),
            TimeDelta::zero(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Filter(_)));
        assert!(err.to_string().contains("evaluator offline"));
    }

    #[test]
    fn test_missing_event_matches_nothing() {
        let result = run_with(EventNameEvaluator, branch(None), edges(), None, TimeDelta::zero()).unwrap();
        assert_eq!(result, RunResult::done());
    }
}
