//! Action and edge lookup in a flow graph.
//!
//! Lookups never depend on the storage order of edges: a branch edge is
//! always found by its `(from, index)` pair.

use flowstep_types::flow::{Action, ActionType, Edge, EdgeType, Flow};

use crate::runner::ConfigurationError;

/// The action with the given id.
pub fn find_action_by_id<'a>(flow: &'a Flow, id: &str) -> Option<&'a Action> {
    flow.actions.get(id)
}

/// The first action (in id order) of the given type.
///
/// Intended for flows known to hold at most one action of that type.
pub fn find_action_by_type(flow: &Flow, action_type: ActionType) -> Option<&Action> {
    flow.actions
        .values()
        .find(|action| action.action_type() == action_type)
}

/// The `branch` edge leaving `from` for condition position `index`.
pub fn find_branch_edge<'a>(flow: &'a Flow, from: &str, index: usize) -> Option<&'a Edge> {
    flow.edges.iter().find(|edge| {
        edge.edge_type == EdgeType::Branch && edge.from == from && edge.index == Some(index)
    })
}

/// The first `continue` edge leaving `from`.
pub fn find_continue_edge<'a>(flow: &'a Flow, from: &str) -> Option<&'a Edge> {
    flow.edges
        .iter()
        .find(|edge| edge.edge_type == EdgeType::Continue && edge.from == from)
}

/// Resolve the action a branch edge points to.
///
/// A missing edge or a dangling target is a configuration error of the flow.
pub fn resolve_branch_target<'a>(
    flow: &'a Flow,
    from: &str,
    index: usize,
) -> Result<&'a Action, ConfigurationError> {
    let edge = find_branch_edge(flow, from, index).ok_or_else(|| {
        ConfigurationError::BranchEdgeNotFound {
            from: from.to_string(),
            index,
        }
    })?;
    find_action_by_id(flow, &edge.to).ok_or_else(|| ConfigurationError::ActionNotFound(edge.to.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::build_flow;
    use flowstep_types::flow::{ActionConfig, Condition};
    use serde_json::json;

    fn flow() -> Flow {
        build_flow(
            vec![
                Action::new("trigger", ActionConfig::Trigger),
                Action::new(
                    "branch",
                    ActionConfig::ConditionalBranch {
                        conditions: vec![
                            Condition::new(json!("true")),
                            Condition::new(json!("true")),
                        ],
                        delay_duration: None,
                    },
                ),
                Action::new("a", ActionConfig::Delay { delay_duration: "1h".to_string() }),
                Action::new("b", ActionConfig::Delay { delay_duration: "2h".to_string() }),
            ],
            vec![
                Edge::continue_to("trigger", "branch"),
                Edge::branch("branch", "b", 1),
                Edge::branch("branch", "a", 0),
                Edge::branch("branch", "ghost", 2),
                Edge::continue_to("branch", "b"),
            ],
        )
    }

    #[test]
    fn test_find_action_by_id() {
        let flow = flow();
        assert_eq!(find_action_by_id(&flow, "a").unwrap().id, "a");
        assert!(find_action_by_id(&flow, "missing").is_none());
    }

    #[test]
    fn test_find_action_by_type() {
        let flow = flow();
        assert_eq!(find_action_by_type(&flow, ActionType::Trigger).unwrap().id, "trigger");
        // Two delays: the first in id order wins.
        assert_eq!(find_action_by_type(&flow, ActionType::Delay).unwrap().id, "a");
        assert!(find_action_by_type(&flow, ActionType::Exit).is_none());
    }

    #[test]
    fn test_find_branch_edge_ignores_storage_order() {
        let flow = flow();
        assert_eq!(find_branch_edge(&flow, "branch", 0).unwrap().to, "a");
        assert_eq!(find_branch_edge(&flow, "branch", 1).unwrap().to, "b");
        assert!(find_branch_edge(&flow, "branch", 3).is_none());
        assert!(find_branch_edge(&flow, "trigger", 0).is_none());
    }

    #[test]
    fn test_find_continue_edge() {
        let flow = flow();
        assert_eq!(find_continue_edge(&flow, "branch").unwrap().to, "b");
        assert!(find_continue_edge(&flow, "a").is_none());
    }

    #[test]
    fn test_resolve_branch_target_errors() {
        let flow = flow();
        assert_eq!(resolve_branch_target(&flow, "branch", 0).unwrap().id, "a");
        assert!(matches!(
            resolve_branch_target(&flow, "branch", 5),
            Err(ConfigurationError::BranchEdgeNotFound { index: 5, .. })
        ));
        assert!(matches!(
            resolve_branch_target(&flow, "branch", 2),
            Err(ConfigurationError::ActionNotFound(id)) if id == "ghost"
        ));
    }
}
