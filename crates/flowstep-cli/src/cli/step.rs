//! `flowstep step`: run one step of a persisted invocation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use console::style;
use flowstep_core::runner::RunnerRegistry;
use flowstep_core::step::{self, StepOutcome, StepStatus};
use flowstep_types::config::EngineConfig;
use flowstep_types::invocation::Invocation;

use crate::files;

pub async fn run_step(
    config: &EngineConfig,
    flow_path: &Path,
    state_path: &Path,
    now: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let flow = Arc::new(files::load_flow(flow_path).await?);
    let state = files::load_state(state_path).await?;
    let registry = RunnerRegistry::jexl(config);
    let invocation = Invocation::new(flow, state);

    let outcome = step::step(&registry, &invocation, now)
        .with_context(|| format!("step failed for flow '{}'", invocation.flow.name))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!();
        println!("  {}", describe(&outcome));
        println!();
        println!(
            "  {} {}",
            style("Next state:").bold(),
            serde_json::to_string(&outcome.next_state)?
        );
        println!();
    }
    Ok(())
}

/// One styled line summarizing a step.
pub fn describe(outcome: &StepOutcome) -> String {
    match &outcome.status {
        StepStatus::Advanced => {
            let next = outcome
                .next_state
                .current_action
                .as_ref()
                .map(|cursor| cursor.id.as_str())
                .unwrap_or("-");
            format!(
                "{} {} -> {}",
                style("*").green().bold(),
                style(&outcome.action_id).cyan(),
                style(next).cyan()
            )
        }
        StepStatus::Waiting { scheduled_at } => format!(
            "{} {} waiting until {}",
            style("~").yellow().bold(),
            style(&outcome.action_id).cyan(),
            style(scheduled_at.to_rfc3339()).dim()
        ),
        StepStatus::Finished => format!(
            "{} {} finished the flow",
            style("*").green().bold(),
            style(&outcome.action_id).cyan()
        ),
    }
}
