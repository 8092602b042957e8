//! The scenario abstraction.

use wavesense_bfm::{Descriptor, FrameLog, ResetSpec, StreamInterface};
use wavesense_sim::Dut;

use crate::models::RESET;
use crate::report::Failure;
use crate::settings::{ScenarioDefaults, ScenarioSettings};

/// Counts the orchestrator checks before handing over to
/// [`Scenario::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Expected {
    /// Beats the input interface must accept.
    pub input_transactions: u64,
    /// Beats the output interface must produce.
    pub output_transactions: u64,
    /// Frames closed by `last` on the output, when the stream is framed.
    pub output_frames: Option<usize>,
}

/// Stimulus for one run and what it should produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Descriptors driven in order on the input interface.
    pub descriptors: Vec<Descriptor>,
    /// Counts the output must reach.
    pub expected: Expected,
}

impl Plan {
    /// A plan whose input count is the number of beats in `descriptors`.
    pub fn new(descriptors: Vec<Descriptor>, output_transactions: u64) -> Self {
        let input_transactions = descriptors.iter().map(|d| d.len() as u64).sum();
        Self {
            descriptors,
            expected: Expected {
                input_transactions,
                output_transactions,
                output_frames: None,
            },
        }
    }

    /// Also expects `frames` closed output frames.
    pub fn with_frames(mut self, frames: usize) -> Self {
        self.expected.output_frames = Some(frames);
        self
    }

    /// Every planned input beat, in driving order.
    pub fn beats(&self) -> Vec<Vec<i64>> {
        self.descriptors
            .iter()
            .flat_map(|d| d.beats().map(|(fields, _)| fields.to_vec()).collect::<Vec<_>>())
            .collect()
    }
}

/// What the monitors captured.
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    /// Beats accepted on the input interface.
    pub input: Vec<Vec<i64>>,
    /// Output beats grouped into frames.
    pub output: FrameLog,
}

impl Observed {
    /// One lane of every output beat.
    pub fn output_lane(&self, index: usize) -> Vec<i64> {
        self.output
            .beats()
            .filter_map(|beat| beat.get(index).copied())
            .collect()
    }

    /// Output beats as `(re, im)` pairs.
    pub fn output_pairs(&self) -> Vec<(i64, i64)> {
        self.output
            .beats()
            .map(|beat| (beat.first().copied().unwrap_or(0), beat.get(1).copied().unwrap_or(0)))
            .collect()
    }
}

/// One verification scenario: a DUT, its stimulus, and its checks.
pub trait Scenario {
    /// Catalog name.
    fn name(&self) -> &str;

    /// One-line description.
    fn summary(&self) -> &str;

    /// Settings used when the configuration does not override them.
    fn defaults(&self) -> ScenarioDefaults;

    /// Builds a fresh device under test.
    fn dut(&self, settings: &ScenarioSettings) -> Box<dyn Dut>;

    /// The driven interface.
    fn input(&self) -> StreamInterface;

    /// The monitored interface.
    fn output(&self) -> StreamInterface;

    /// Reset sequence applied before driving.
    fn reset(&self) -> ResetSpec {
        ResetSpec::active_high(RESET, 2)
    }

    /// Generates stimulus and the counts it must produce.
    fn plan(&self, settings: &ScenarioSettings) -> Result<Plan, Failure>;

    /// Compares the capture against the reference model.
    fn check(
        &self,
        plan: &Plan,
        observed: &Observed,
        settings: &ScenarioSettings,
    ) -> Result<(), Failure>;
}
