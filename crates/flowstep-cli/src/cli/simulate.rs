//! `flowstep simulate`: run a flow end to end on a virtual clock.
//!
//! The clock jumps to each `scheduled_at`, so multi-hour waits finish
//! instantly while still passing through every capped re-check.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use console::style;
use flowstep_core::filter::FilterEvaluator;
use flowstep_core::runner::RunnerRegistry;
use flowstep_core::step::{self, StepOutcome, StepStatus};
use flowstep_types::config::EngineConfig;
use flowstep_types::flow::Flow;
use flowstep_types::invocation::FlowEvent;
use serde::Serialize;

use super::step::describe;
use crate::files;

/// A step taken at a point on the virtual clock.
#[derive(Debug, Serialize)]
pub struct SimulatedStep {
    pub at: DateTime<Utc>,
    pub outcome: StepOutcome,
}

#[derive(Debug, Serialize)]
pub struct Simulation {
    pub flow: String,
    pub finished: bool,
    pub steps: Vec<SimulatedStep>,
}

/// Step an invocation of `flow` until it finishes or `max_steps` is reached.
pub fn simulate<E: FilterEvaluator>(
    registry: &RunnerRegistry<E>,
    flow: Arc<Flow>,
    event: Option<FlowEvent>,
    start: DateTime<Utc>,
    max_steps: usize,
) -> Result<Simulation> {
    let mut now = start;
    let mut invocation = step::start(Arc::clone(&flow), event, now)?;
    let mut steps = Vec::new();
    let mut finished = false;

    for _ in 0..max_steps {
        let outcome = step::step(registry, &invocation, now)
            .with_context(|| format!("simulation failed at {now}"))?;
        let at = now;
        if let StepStatus::Waiting { scheduled_at } = outcome.status {
            now = scheduled_at.max(now);
        }
        finished = outcome.is_finished();
        invocation.state = outcome.next_state.clone();
        steps.push(SimulatedStep { at, outcome });
        if finished {
            break;
        }
    }

    Ok(Simulation {
        flow: flow.name.clone(),
        finished,
        steps,
    })
}

pub async fn run_simulate(
    config: &EngineConfig,
    flow_path: &Path,
    event_path: Option<&Path>,
    start: DateTime<Utc>,
    max_steps: usize,
    json: bool,
) -> Result<()> {
    let flow = Arc::new(files::load_flow(flow_path).await?);
    let event = match event_path {
        Some(path) => Some(files::load_event(path).await?),
        None => None,
    };
    let registry = RunnerRegistry::jexl(config);

    tracing::info!(flow = %flow.name, max_steps, "starting simulation");
    let simulation = simulate(&registry, flow, event, start, max_steps)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&simulation)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style("Simulating").bold(),
        style(&simulation.flow).cyan()
    );
    println!();
    for simulated in &simulation.steps {
        println!(
            "  {}  {}",
            style(simulated.at.format("%Y-%m-%d %H:%M:%S")).dim(),
            describe(&simulated.outcome)
        );
    }
    println!();
    if !simulation.finished {
        println!(
            "  {} stopped after {} steps without finishing",
            style("!").yellow().bold(),
            simulation.steps.len()
        );
        println!();
    }
    Ok(())
}
