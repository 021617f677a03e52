//! Flow graph types for Flowstep.
//!
//! A `Flow` is an immutable directed graph: a mapping from action id to
//! `Action`, plus an unordered collection of typed `Edge`s. Flows are shared
//! read-only across every invocation executing them; structural changes
//! require a new flow version.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// The full workflow graph.
///
/// Deserialization makes every action's `id` agree with the key it is stored
/// under: definitions may omit `id` inside the action body, and the key wins
/// when both are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FlowDef")]
pub struct Flow {
    /// UUIDv7 assigned when the flow is created.
    pub id: Uuid,
    /// Human-readable flow name.
    pub name: String,
    /// Monotonic version number. Structural changes produce a new version.
    pub version: u32,
    /// Actions keyed by id. Iteration order is the id order.
    pub actions: BTreeMap<String, Action>,
    /// Edges in storage order. Lookups never depend on this order.
    pub edges: Vec<Edge>,
}

/// Stored shape of a `Flow`, before action ids are reconciled with their keys.
#[derive(Deserialize)]
struct FlowDef {
    id: Uuid,
    name: String,
    #[serde(default = "default_version")]
    version: u32,
    actions: BTreeMap<String, Action>,
    #[serde(default)]
    edges: Vec<Edge>,
}

fn default_version() -> u32 {
    1
}

impl From<FlowDef> for Flow {
    fn from(def: FlowDef) -> Self {
        let mut actions = def.actions;
        for (key, action) in actions.iter_mut() {
            if action.id != *key {
                action.id = key.clone();
            }
        }
        Self {
            id: def.id,
            name: def.name,
            version: def.version,
            actions,
            edges: def.edges,
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A typed node in the flow graph.
///
/// Serialized as `{ "id", "name"?, "type", "config" }`: the `type` tag and
/// the `config` payload come from the flattened `ActionConfig`, so the type
/// can never disagree with the configuration it selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique within a flow, stable for the lifetime of the flow.
    #[serde(default)]
    pub id: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Type tag and type-specific configuration.
    #[serde(flatten)]
    pub config: ActionConfig,
}

impl Action {
    /// Convenience constructor used by builders and tests.
    pub fn new(id: impl Into<String>, config: ActionConfig) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            config,
        }
    }

    /// The discriminator selecting which runner applies.
    pub fn action_type(&self) -> ActionType {
        self.config.action_type()
    }
}

/// Type-specific action configuration.
///
/// Adjacently tagged to match the stored shape:
/// ```yaml
/// type: delay
/// config:
///   delay_duration: 2h
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Entry point of a flow. Completes immediately.
    Trigger,
    /// Wait until `delay_duration` has elapsed since the action started.
    Delay {
        /// Duration quantity with unit, e.g. "2h", "5m", "300s".
        delay_duration: String,
    },
    /// Pick the branch of the first condition matching the event.
    ConditionalBranch {
        /// Ordered conditions. Position `i` pairs with the branch edge `index = i`.
        conditions: Vec<Condition>,
        /// How long to keep re-checking before giving up. Absent or zero
        /// means a single check.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay_duration: Option<String>,
    },
    /// Re-check a single condition until it matches or the wait expires.
    WaitUntilCondition {
        condition: Condition,
        max_wait_duration: String,
    },
    /// Terminal node. The flow ends here even if a continue edge exists.
    Exit,
}

impl ActionConfig {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionConfig::Trigger => ActionType::Trigger,
            ActionConfig::Delay { .. } => ActionType::Delay,
            ActionConfig::ConditionalBranch { .. } => ActionType::ConditionalBranch,
            ActionConfig::WaitUntilCondition { .. } => ActionType::WaitUntilCondition,
            ActionConfig::Exit => ActionType::Exit,
        }
    }
}

/// The kind of action, without its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Trigger,
    Delay,
    ConditionalBranch,
    WaitUntilCondition,
    Exit,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Trigger => "trigger",
            ActionType::Delay => "delay",
            ActionType::ConditionalBranch => "conditional_branch",
            ActionType::WaitUntilCondition => "wait_until_condition",
            ActionType::Exit => "exit",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter expression guarding one outgoing branch.
///
/// `filters` is opaque here; only the filter evaluator interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub filters: serde_json::Value,
}

impl Condition {
    pub fn new(filters: serde_json::Value) -> Self {
        Self {
            name: None,
            filters,
        }
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// A directed, typed connection between two actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    /// Condition position this edge satisfies. Only set on `branch` edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Edge {
    pub fn branch(from: impl Into<String>, to: impl Into<String>, index: usize) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type: EdgeType::Branch,
            index: Some(index),
        }
    }

    pub fn continue_to(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type: EdgeType::Continue,
            index: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Conditional, ordinal-indexed.
    Branch,
    /// Unconditional default path.
    Continue,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
