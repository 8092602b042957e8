//! Scenario orchestration for the wavesense verification harness.
//!
//! A [`Scenario`] names a device under test, the stimulus to push through it,
//! and the checks its output must satisfy. [`run_scenario`] walks one
//! scenario through reset, drive, drain, and compare on a fresh simulation
//! kernel and returns a [`ScenarioReport`] with the terminal state and every
//! mismatch found.
//!
//! The devices exercised by the built-in [`scenarios`] are cycle-level
//! behavioral models of the baseband pipeline blocks, in [`models`].
//!
//! # Modules
//!
//! - `models`: behavioral stream models and the shared handshake wrapper
//! - `scenario`: the scenario trait, stimulus plans, and observed output
//! - `settings`: built-in defaults merged with configuration overrides
//! - `orchestrator`: the per-scenario state machine
//! - `verdict`: aggregation of comparisons into a failure
//! - `report`: terminal states, failures, and serializable reports
//! - `runner`: selection and sequential execution of scenarios

#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod scenarios;
pub mod settings;
pub mod verdict;

pub use error::HarnessError;
pub use orchestrator::{run_scenario, RunOptions};
pub use report::{Failure, MismatchRecord, Outcome, ScenarioReport, State, Transition};
pub use runner::{run_scenarios, Selection};
pub use scenario::{Expected, Observed, Plan, Scenario};
pub use settings::{ScenarioDefaults, ScenarioSettings};
pub use verdict::Verdict;
