//! Delay line with a scripted stall pattern downstream.

use wavesense_bfm::{Descriptor, Framing, StreamInterface};
use wavesense_config::{BackpressureConfig, PolicyKind, WindowConfig};
use wavesense_golden::delay_line;
use wavesense_golden::synth::ramp;
use wavesense_sim::Dut;

use crate::models::{DelayLine, StreamKernel, StreamStage};
use crate::report::Failure;
use crate::scenario::{Observed, Plan, Scenario};
use crate::settings::{ScenarioDefaults, ScenarioSettings};
use crate::verdict::Verdict;

const DEPTH: usize = 16;

/// A 16-deep delay line fed with a ramp of the same period, so every output
/// equals the input one period later.
pub struct DelayLineScenario;

impl Scenario for DelayLineScenario {
    fn name(&self) -> &str {
        "delay_line"
    }

    fn summary(&self) -> &str {
        "16-stage delay line under scripted backpressure"
    }

    fn defaults(&self) -> ScenarioDefaults {
        ScenarioDefaults {
            samples: 80,
            backpressure: BackpressureConfig {
                policy: PolicyKind::Scripted,
                p_ready: 1.0,
                windows: vec![
                    WindowConfig { ready: true, cycles: 26 },
                    WindowConfig { ready: false, cycles: 100 },
                    WindowConfig { ready: true, cycles: 15 },
                    WindowConfig { ready: false, cycles: 49 },
                ],
            },
            ..ScenarioDefaults::default()
        }
    }

    fn dut(&self, _settings: &ScenarioSettings) -> Box<dyn Dut> {
        Box::new(StreamStage::new(DelayLine::new(DEPTH)))
    }

    fn input(&self) -> StreamInterface {
        DelayLine::new(DEPTH).input()
    }

    fn output(&self) -> StreamInterface {
        DelayLine::new(DEPTH).output()
    }

    fn plan(&self, settings: &ScenarioSettings) -> Result<Plan, Failure> {
        let input = ramp(DEPTH as i64, settings.samples);
        let expected = settings.samples.saturating_sub(DEPTH) as u64;
        Ok(Plan::new(vec![Descriptor::from_columns(&[input.as_slice()], Framing::Never)], expected))
    }

    fn check(
        &self,
        plan: &Plan,
        observed: &Observed,
        _settings: &ScenarioSettings,
    ) -> Result<(), Failure> {
        let input: Vec<i64> = plan.beats().into_iter().map(|b| b[0]).collect();
        let output = observed.output_lane(0);
        let mut verdict = Verdict::new();
        verdict.exact("output data", &output, &delay_line(&input, DEPTH));
        // The ramp repeats every DEPTH samples: output t also equals input t + DEPTH.
        let shifted = input.get(DEPTH..).unwrap_or_default();
        verdict.exact("output against one period later", &output, shifted);
        verdict.finish()
    }
}
