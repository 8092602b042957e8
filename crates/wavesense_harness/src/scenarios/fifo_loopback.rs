//! Framed random traffic through a FIFO with idle gaps and random stalls.

use wavesense_bfm::{Descriptor, Framing, StreamInterface};
use wavesense_config::{BackpressureConfig, PolicyKind};
use wavesense_sim::Dut;

use super::{iq_beats, random_iq};
use crate::models::{StreamFifo, StreamKernel, StreamStage};
use crate::report::Failure;
use crate::scenario::{Observed, Plan, Scenario};
use crate::settings::{ScenarioDefaults, ScenarioSettings};
use crate::verdict::Verdict;

const DEPTH: usize = 8;
const FRAME: usize = 64;

/// Loopback: output beats and frame boundaries must equal the input.
pub struct FifoLoopbackScenario;

impl Scenario for FifoLoopbackScenario {
    fn name(&self) -> &str {
        "fifo_loopback"
    }

    fn summary(&self) -> &str {
        "FIFO loopback of framed I/Q with idle gaps and random backpressure"
    }

    fn defaults(&self) -> ScenarioDefaults {
        ScenarioDefaults {
            frames: 4,
            backpressure: BackpressureConfig {
                policy: PolicyKind::Random,
                p_ready: 0.5,
                windows: Vec::new(),
            },
            idle_gaps: Some((0.2, 3)),
            ..ScenarioDefaults::default()
        }
    }

    fn dut(&self, _settings: &ScenarioSettings) -> Box<dyn Dut> {
        Box::new(StreamStage::with_capacity(StreamFifo::new(DEPTH), DEPTH))
    }

    fn input(&self) -> StreamInterface {
        StreamFifo::new(DEPTH).input()
    }

    fn output(&self) -> StreamInterface {
        StreamFifo::new(DEPTH).output()
    }

    fn plan(&self, settings: &ScenarioSettings) -> Result<Plan, Failure> {
        let samples = random_iq(settings.seed, settings.frames * FRAME);
        Ok(Plan::new(
            vec![Descriptor::Burst {
                beats: iq_beats(&samples),
                framing: Framing::Every(FRAME),
            }],
            samples.len() as u64,
        )
        .with_frames(settings.frames))
    }

    fn check(
        &self,
        plan: &Plan,
        observed: &Observed,
        _settings: &ScenarioSettings,
    ) -> Result<(), Failure> {
        let sent = plan.beats();
        let received: Vec<Vec<i64>> = observed.output.beats().cloned().collect();
        let mut verdict = Verdict::new();
        for (lane, name) in ["i", "q"].into_iter().enumerate() {
            let column = |beats: &[Vec<i64>]| beats.iter().map(|b| b[lane]).collect::<Vec<_>>();
            verdict.exact(&format!("output {name}"), &column(&received), &column(&sent));
        }
        let lengths: Vec<usize> = observed.output.closed().iter().map(|f| f.len()).collect();
        verdict.exact("frame length", &lengths, &vec![FRAME; lengths.len()]);
        verdict.property(
            "open frame after the last beat",
            observed.output.open().is_empty(),
            0,
            observed.output.open().len(),
        );
        verdict.finish()
    }
}
