//! Execution core for Flowstep flows.
//!
//! Runs one action of an invocation at a time and reports whether the action
//! completed (optionally naming the next action) or must be checked again
//! later. Nothing here sleeps, spawns, or performs I/O: waiting is expressed
//! as a returned `scheduled_at` deadline and the external scheduler owns the
//! actual re-invocation.
//!
//! - `time` -- elapsed/remaining math, poll capping, duration parsing
//! - `filter` -- condition evaluator contract and the JEXL implementation
//! - `navigation` -- action and edge lookup in a flow graph
//! - `runner` -- the `ActionRunner` contract, one runner per action type
//! - `step` -- run the current action and compute the next invocation state

pub mod filter;
pub mod navigation;
pub mod runner;
pub mod step;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;
