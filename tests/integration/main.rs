//! ferry integration test harness.
//!
//! Drives the dispatcher, worker pool, and upload tasks end to end against
//! an in-memory remote service. No network or filesystem access is needed:
//!
//!   cargo test --test integration

mod infra;
mod properties;
mod scenarios;
