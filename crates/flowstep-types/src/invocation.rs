//! Invocation and run-result types for Flowstep.
//!
//! An `Invocation` is one durable execution of a flow against one triggering
//! event. Its `state` is a plain serializable value: the external scheduler
//! persists it between steps and replaces it with the state returned by the
//! core, never mutating it in place.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::flow::{Action, Flow};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// The event that triggered an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEvent {
    /// Event name, e.g. "$pageview".
    pub event: String,
    /// Identifier of the actor that produced the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_id: Option<String>,
    /// Free-form property bag.
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// When the event happened, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl FlowEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            distinct_id: None,
            properties: Map::new(),
            timestamp: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// The invocation cursor: which action is executing and since when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentAction {
    pub id: String,
    /// Epoch milliseconds at which execution of this action began.
    ///
    /// The authoritative origin for elapsed-time math. It is set once when
    /// the cursor advances to the action and never reset on re-invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_timestamp: Option<i64>,
}

impl CurrentAction {
    /// Point the cursor at `id`, starting now.
    pub fn started(id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            started_at_timestamp: Some(at.timestamp_millis()),
        }
    }

    /// The start timestamp, if present and representable.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at_timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

/// Persisted, per-invocation execution state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_action: Option<CurrentAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<FlowEvent>,
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// One in-progress execution of a flow.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// UUIDv7 invocation ID.
    pub id: Uuid,
    /// The flow being executed, shared read-only.
    pub flow: Arc<Flow>,
    pub state: InvocationState,
}

impl Invocation {
    /// Create an invocation with a fresh ID.
    pub fn new(flow: Arc<Flow>, state: InvocationState) -> Self {
        Self {
            id: Uuid::now_v7(),
            flow,
            state,
        }
    }

    pub fn event(&self) -> Option<&FlowEvent> {
        self.state.event.as_ref()
    }

    pub fn current_action(&self) -> Option<&CurrentAction> {
        self.state.current_action.as_ref()
    }
}

// ---------------------------------------------------------------------------
// RunResult
// ---------------------------------------------------------------------------

/// Outcome of running one action once.
///
/// On the wire this is `{ "done": bool, "go_to_action"?: Action,
/// "scheduled_at"?: timestamp }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RunResultWire", into = "RunResultWire")]
pub enum RunResult {
    /// The action is complete. With `go_to_action` the cursor moves there;
    /// without it the caller falls through to the default path or ends.
    Done { go_to_action: Option<Action> },
    /// The action is incomplete. Re-invoke no earlier than `scheduled_at`.
    Pending { scheduled_at: DateTime<Utc> },
}

impl RunResult {
    /// Completed with no explicit successor.
    pub fn done() -> Self {
        RunResult::Done { go_to_action: None }
    }

    /// Completed, continuing at `action`.
    pub fn go_to(action: Action) -> Self {
        RunResult::Done {
            go_to_action: Some(action),
        }
    }

    pub fn pending(scheduled_at: DateTime<Utc>) -> Self {
        RunResult::Pending { scheduled_at }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, RunResult::Done { .. })
    }

    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RunResult::Pending { scheduled_at } => Some(*scheduled_at),
            RunResult::Done { .. } => None,
        }
    }

    pub fn go_to_action(&self) -> Option<&Action> {
        match self {
            RunResult::Done { go_to_action } => go_to_action.as_ref(),
            RunResult::Pending { .. } => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RunResultWire {
    done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    go_to_action: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scheduled_at: Option<DateTime<Utc>>,
}

impl From<RunResult> for RunResultWire {
    fn from(result: RunResult) -> Self {
        match result {
            RunResult::Done { go_to_action } => Self {
                done: true,
                go_to_action,
                scheduled_at: None,
            },
            RunResult::Pending { scheduled_at } => Self {
                done: false,
                go_to_action: None,
                scheduled_at: Some(scheduled_at),
            },
        }
    }
}

impl TryFrom<RunResultWire> for RunResult {
    type Error = String;

    fn try_from(wire: RunResultWire) -> Result<Self, Self::Error> {
        match (wire.done, wire.scheduled_at, wire.go_to_action) {
            (false, Some(scheduled_at), None) => Ok(RunResult::Pending { scheduled_at }),
            (false, None, _) => Err("an unfinished result needs 'scheduled_at'".to_string()),
            (false, Some(_), Some(_)) => {
                Err("an unfinished result cannot carry 'go_to_action'".to_string())
            }
            (true, None, go_to_action) => Ok(RunResult::Done { go_to_action }),
            (true, Some(_), _) => Err("a finished result cannot carry 'scheduled_at'".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
