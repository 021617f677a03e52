//! Shared domain types for Flowstep.
//!
//! This crate contains the data model the execution core operates on:
//! the flow graph (actions and edges), the invocation cursor, the result
//! of running one action, and engine configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono.

pub mod config;
pub mod flow;
pub mod invocation;
