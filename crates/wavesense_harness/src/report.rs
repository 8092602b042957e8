//! Scenario outcomes and reports.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use wavesense_sim::SimError;

/// Orchestrator states. `Pass` and `Fail` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Nothing built yet.
    Idle,
    /// Reset asserted on the DUT.
    Resetting,
    /// Drivers pushing stimulus.
    Driving,
    /// Stimulus done; waiting for the remaining output.
    Draining,
    /// Simulation stopped; checking captured output.
    Comparing,
    /// Every check held.
    Pass,
    /// A check failed or the run was aborted.
    Fail,
}

impl State {
    /// Returns `true` for `Pass` and `Fail`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Pass | Self::Fail)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resetting => "resetting",
            Self::Driving => "driving",
            Self::Draining => "draining",
            Self::Comparing => "comparing",
            Self::Pass => "pass",
            Self::Fail => "fail",
        };
        f.write_str(name)
    }
}

/// Entry into a state at a given clock cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// The state entered.
    pub state: State,
    /// Kernel cycle at entry.
    pub cycle: u64,
}

/// One differing value, rendered for display and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchRecord {
    /// The compared sequence, e.g. `"output re"`.
    pub what: String,
    /// Position within that sequence.
    pub index: usize,
    /// Captured value.
    pub actual: String,
    /// Reference value.
    pub expected: String,
}

impl fmt::Display for MismatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: expected {}, got {}",
            self.what, self.index, self.expected, self.actual
        )
    }
}

/// Why a scenario failed.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// A driver never saw `ready` within its stall budget.
    #[error("protocol stall on '{interface}': ready not observed for {cycles} cycles")]
    ProtocolStall {
        /// The stalled interface.
        interface: String,
        /// Cycles waited.
        cycles: u64,
    },

    /// A phase ran out of cycles.
    #[error("timed out after {cycles} cycles waiting for {waiting_for}")]
    Timeout {
        /// What the phase was waiting for.
        waiting_for: String,
        /// The exhausted budget.
        cycles: u64,
    },

    /// A transaction or frame count differs from the plan.
    #[error("{what}: expected {expected}, observed {actual}")]
    CountMismatch {
        /// Which count.
        what: String,
        /// Planned count.
        expected: u64,
        /// Observed count.
        actual: u64,
    },

    /// Captured values differ from the reference.
    #[error("{} of {compared} compared values differ", mismatches.len())]
    DataMismatch {
        /// Values checked across every comparison.
        compared: usize,
        /// All differing values.
        mismatches: Vec<MismatchRecord>,
    },

    /// The kernel reported an error other than a stall or timeout.
    #[error("simulation error: {message}")]
    Simulation {
        /// The kernel's message.
        message: String,
    },

    /// Stimulus could not be loaded or generated.
    #[error("stimulus error: {message}")]
    Stimulus {
        /// What went wrong.
        message: String,
    },
}

impl From<SimError> for Failure {
    fn from(err: SimError) -> Self {
        match err {
            SimError::ProtocolStall { interface, cycles } => {
                Self::ProtocolStall { interface, cycles }
            }
            SimError::Timeout { waiting_for, cycles } => Self::Timeout { waiting_for, cycles },
            other => Self::Simulation {
                message: other.to_string(),
            },
        }
    }
}

/// Terminal verdict of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    /// Every check held.
    Pass,
    /// The first failure encountered.
    Fail {
        /// Its cause.
        failure: Failure,
    },
}

/// Everything known about one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed used for randomized backpressure and stimulus.
    pub seed: u64,
    /// Verdict.
    pub outcome: Outcome,
    /// Every state entered, in order.
    pub trace: Vec<Transition>,
    /// Clock cycles simulated.
    pub cycles: u64,
    /// Beats accepted on the input interface.
    pub input_transactions: u64,
    /// Beats observed on the output interface.
    pub output_transactions: u64,
    /// Output frames closed by `last`.
    pub output_frames: usize,
    /// Waveform dump, if one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waveform: Option<PathBuf>,
}

impl ScenarioReport {
    /// A report for a run that failed before simulation started.
    pub fn not_started(scenario: &str, seed: u64, failure: Failure) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            outcome: Outcome::Fail { failure },
            trace: vec![
                Transition {
                    state: State::Idle,
                    cycle: 0,
                },
                Transition {
                    state: State::Fail,
                    cycle: 0,
                },
            ],
            cycles: 0,
            input_transactions: 0,
            output_transactions: 0,
            output_frames: 0,
            waveform: None,
        }
    }

    /// Returns `true` if the scenario passed.
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }

    /// The failure, if any.
    pub fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            Outcome::Pass => None,
            Outcome::Fail { failure } => Some(failure),
        }
    }

    /// The terminal state.
    pub fn state(&self) -> State {
        if self.passed() {
            State::Pass
        } else {
            State::Fail
        }
    }
}
