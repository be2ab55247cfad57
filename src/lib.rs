//! perfgate - load-test statistics aggregation and performance quality gates
//!
//! This library aggregates per-request samples of load-test runs into
//! per-endpoint and per-run statistics, diffs runs against their
//! predecessors, and evaluates absolute and relative constraints against a
//! build history to produce a SUCCESS / UNSTABLE / FAILURE verdict.

pub mod build;
pub mod cli;
pub mod config;
pub mod constraint;
pub mod error;
pub mod escalation;
pub mod filter;
pub mod history;
pub mod numeric;
pub mod report;
pub mod sample;
pub mod snapshot;
pub mod stats;
pub mod trend;

pub use error::{GateError, Result};
