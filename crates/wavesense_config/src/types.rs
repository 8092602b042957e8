//! Configuration types deserialized from `wavesense.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use wavesense_common::{Frequency, ParseFrequencyError};

/// The root configuration parsed from a `wavesense.toml` file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WavesenseConfig {
    /// Run-wide settings.
    #[serde(default)]
    pub harness: HarnessConfig,
    /// Per-scenario overrides keyed by scenario name.
    #[serde(default)]
    pub scenarios: BTreeMap<String, ScenarioConfig>,
}

impl WavesenseConfig {
    /// Overrides for `name`, or the empty override set.
    pub fn scenario(&self, name: &str) -> ScenarioConfig {
        self.scenarios.get(name).cloned().unwrap_or_default()
    }

    /// Seed for `name`: the scenario's own seed, else the harness seed.
    pub fn seed_for(&self, name: &str) -> u64 {
        self.scenarios
            .get(name)
            .and_then(|s| s.seed)
            .unwrap_or(self.harness.seed)
    }
}

/// Settings shared by every scenario in a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Reference clock frequency, e.g. `"100MHz"`.
    pub clock: String,
    /// Combinational settle iterations allowed per phase.
    pub max_deltas: u32,
    /// Waveform dump format.
    pub waveform: WaveformFormat,
    /// Directory for waveform dumps and reports.
    pub output_dir: PathBuf,
    /// Default seed for randomized backpressure and idle gaps.
    pub seed: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            clock: "100MHz".to_string(),
            max_deltas: 1000,
            waveform: WaveformFormat::None,
            output_dir: PathBuf::from("target/wavesense"),
            seed: 1,
        }
    }
}

impl HarnessConfig {
    /// Parses [`clock`](Self::clock).
    pub fn clock_frequency(&self) -> Result<Frequency, ParseFrequencyError> {
        self.clock.parse()
    }
}

/// Waveform output format.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WaveformFormat {
    /// No waveform output (default).
    #[default]
    None,
    /// Value Change Dump (IEEE 1364).
    Vcd,
}

/// Overrides for one scenario. Unset fields fall back to the scenario's
/// built-in defaults.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Whether `wavesense run` without names includes this scenario.
    pub enabled: bool,
    /// Cycles allowed for the whole drive-and-monitor phase.
    pub cycle_budget: Option<u64>,
    /// Cycles a driver may wait for `ready` on one beat.
    pub stall_budget: Option<u64>,
    /// Extra cycles to keep monitoring after the expected count is reached.
    pub drain_cycles: Option<u64>,
    /// Seed for this scenario only.
    pub seed: Option<u64>,
    /// Number of input samples to generate.
    pub samples: Option<usize>,
    /// Number of frames or blocks to generate.
    pub frames: Option<usize>,
    /// Downstream `ready` policy.
    pub backpressure: Option<BackpressureConfig>,
    /// Comparison tolerance for non bit-exact outputs.
    pub tolerance: Option<ToleranceConfig>,
    /// Static capture used instead of synthesized stimulus.
    pub stimulus: Option<StimulusConfig>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cycle_budget: None,
            stall_budget: None,
            drain_cycles: None,
            seed: None,
            samples: None,
            frames: None,
            backpressure: None,
            tolerance: None,
            stimulus: None,
        }
    }
}

/// Downstream readiness policy as written in the config file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BackpressureConfig {
    /// Which policy to play.
    pub policy: PolicyKind,
    /// Per-cycle probability of `ready` for [`PolicyKind::Random`].
    #[serde(default = "default_p_ready")]
    pub p_ready: f64,
    /// Windows for [`PolicyKind::Scripted`].
    #[serde(default)]
    pub windows: Vec<WindowConfig>,
}

fn default_p_ready() -> f64 {
    0.5
}

/// Readiness policy selector.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// `ready` held high.
    Always,
    /// Explicit windows of asserted and deasserted cycles.
    Scripted,
    /// Seeded per-cycle coin flip.
    Random,
}

/// One scripted readiness window.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    /// Level of `ready` during the window.
    pub ready: bool,
    /// Window length in cycles.
    pub cycles: u32,
}

/// `|actual - expected| <= atol + rtol * |expected|`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ToleranceConfig {
    /// Absolute tolerance.
    #[serde(default)]
    pub atol: f64,
    /// Relative tolerance.
    #[serde(default)]
    pub rtol: f64,
}

/// A slice of an interleaved I/Q capture file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StimulusConfig {
    /// Path to the capture, relative to the config file's directory.
    pub file: PathBuf,
    /// First sample to use.
    #[serde(default)]
    pub offset: usize,
    /// Number of samples to use; the rest of the file when unset.
    pub count: Option<usize>,
}
