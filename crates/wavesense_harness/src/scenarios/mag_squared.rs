//! Magnitude squared on a stream without backpressure.

use wavesense_bfm::{Descriptor, Framing, StreamInterface};
use wavesense_golden::mag_squared;
use wavesense_sim::Dut;

use super::{iq_beats, random_iq};
use crate::models::{MagSquared, StreamKernel, StreamStage};
use crate::report::Failure;
use crate::scenario::{Observed, Plan, Scenario};
use crate::settings::{ScenarioDefaults, ScenarioSettings};
use crate::verdict::Verdict;

/// `i² + q²` over full-scale random samples, or over a capture.
pub struct MagSquaredScenario;

impl Scenario for MagSquaredScenario {
    fn name(&self) -> &str {
        "mag_squared"
    }

    fn summary(&self) -> &str {
        "magnitude squared of valid-qualified I/Q samples"
    }

    fn defaults(&self) -> ScenarioDefaults {
        ScenarioDefaults {
            samples: 256,
            idle_gaps: Some((0.25, 4)),
            ..ScenarioDefaults::default()
        }
    }

    fn dut(&self, _settings: &ScenarioSettings) -> Box<dyn Dut> {
        Box::new(StreamStage::new(MagSquared))
    }

    fn input(&self) -> StreamInterface {
        MagSquared.input()
    }

    fn output(&self) -> StreamInterface {
        MagSquared.output()
    }

    fn plan(&self, settings: &ScenarioSettings) -> Result<Plan, Failure> {
        let samples = match &settings.capture {
            Some(capture) => capture.clone(),
            None => random_iq(settings.seed, settings.samples),
        };
        let beats = iq_beats(&samples);
        let count = beats.len() as u64;
        Ok(Plan::new(
            vec![Descriptor::Burst {
                beats,
                framing: Framing::Never,
            }],
            count,
        ))
    }

    fn check(
        &self,
        plan: &Plan,
        observed: &Observed,
        _settings: &ScenarioSettings,
    ) -> Result<(), Failure> {
        let beats = plan.beats();
        let input: Vec<(i64, i64)> = beats.iter().map(|b| (b[0], b[1])).collect();
        let mut verdict = Verdict::new();
        verdict.exact("mag_sq", &observed.output_lane(0), &mag_squared(&input));
        // The capture side must have seen the beats in driving order.
        let lane = |rows: &[Vec<i64>], i: usize| -> Vec<i64> {
            rows.iter().map(|b| b[i]).collect()
        };
        verdict.exact("input i", &lane(&observed.input, 0), &lane(&beats, 0));
        verdict.exact("input q", &lane(&observed.input, 1), &lane(&beats, 1));
        verdict.finish()
    }
}
