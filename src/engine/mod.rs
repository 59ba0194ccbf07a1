//! Execution engine for nagios-nginx
//!
//! The engine orchestrates:
//! 1. Preflight - Reject plans that carry a fatal step
//! 2. Diffing - Compute current vs desired state per step
//! 3. Executing - Apply steps with progress, then summarize and report

pub mod differ;
pub mod executor;
pub mod progress;
pub mod report;

pub use executor::{ApplyOptions, RunOutcome, explain_failure, preflight, run};
pub use report::{Outcome, RunReport};
