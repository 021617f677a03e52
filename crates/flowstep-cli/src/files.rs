//! Reading flows, invocation states and events from disk.
//!
//! Flows are YAML (`.yaml`/`.yml`) or JSON; states and events are JSON, the
//! shape the scheduler persists.

use std::path::Path;

use anyhow::{Context, Result};
use flowstep_types::flow::Flow;
use flowstep_types::invocation::{FlowEvent, InvocationState};
use serde::de::DeserializeOwned;

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = read(path).await?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Load a flow definition.
pub async fn load_flow(path: &Path) -> Result<Flow> {
    let content = read(path).await?;
    let flow: Flow = if is_yaml(path) {
        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("invalid flow YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("invalid flow JSON in {}", path.display()))?
    };
    tracing::debug!(flow = %flow.name, actions = flow.actions.len(), "loaded flow");
    Ok(flow)
}

pub async fn load_state(path: &Path) -> Result<InvocationState> {
    read_json(path).await
}

pub async fn load_event(path: &Path) -> Result<FlowEvent> {
    read_json(path).await
}
