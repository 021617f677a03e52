//! Observability for Flowstep binaries.
//!
//! Library crates only emit `tracing` events; installing a subscriber is left
//! to the binary through `tracing_setup::init_tracing`.

pub mod tracing_setup;
