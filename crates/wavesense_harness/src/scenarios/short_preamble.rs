//! Short training field detection on a padded legacy preamble.

use wavesense_bfm::{Descriptor, Framing, StreamInterface};
use wavesense_common::IqSample;
use wavesense_golden::synth::quantized_preamble;
use wavesense_golden::{Complex64, PlateauDetector};
use wavesense_sim::Dut;

use super::{iq_beats, padded};
use crate::models::{ShortPreambleDetector, StreamKernel, StreamStage};
use crate::report::Failure;
use crate::scenario::{Observed, Plan, Scenario};
use crate::settings::{ScenarioDefaults, ScenarioSettings};
use crate::verdict::Verdict;

/// Preamble amplitude used for synthesized stimulus.
const PEAK: f64 = 8000.0;

/// Delay-and-correlate detector; positions must match the reference detector.
pub struct ShortPreambleScenario;

impl ShortPreambleScenario {
    fn samples(settings: &ScenarioSettings) -> Vec<IqSample> {
        match &settings.capture {
            Some(capture) => capture.clone(),
            None => padded(100, &quantized_preamble(PEAK), 80),
        }
    }

    fn reference(samples: &[IqSample]) -> Vec<i64> {
        let floats: Vec<Complex64> = samples
            .iter()
            .map(|s| Complex64::new(f64::from(s.i), f64::from(s.q)))
            .collect();
        PlateauDetector::default()
            .detect(&floats)
            .into_iter()
            .map(|p| p as i64)
            .collect()
    }
}

impl Scenario for ShortPreambleScenario {
    fn name(&self) -> &str {
        "short_preamble"
    }

    fn summary(&self) -> &str {
        "short preamble plateau detection on a padded legacy preamble"
    }

    fn defaults(&self) -> ScenarioDefaults {
        ScenarioDefaults::default()
    }

    fn dut(&self, _settings: &ScenarioSettings) -> Box<dyn Dut> {
        Box::new(StreamStage::new(ShortPreambleDetector::default()))
    }

    fn input(&self) -> StreamInterface {
        ShortPreambleDetector::default().input()
    }

    fn output(&self) -> StreamInterface {
        ShortPreambleDetector::default().output()
    }

    fn plan(&self, settings: &ScenarioSettings) -> Result<Plan, Failure> {
        let samples = Self::samples(settings);
        let detections = Self::reference(&samples).len() as u64;
        Ok(Plan::new(
            vec![Descriptor::Burst {
                beats: iq_beats(&samples),
                framing: Framing::Never,
            }],
            detections,
        ))
    }

    fn check(
        &self,
        _plan: &Plan,
        observed: &Observed,
        settings: &ScenarioSettings,
    ) -> Result<(), Failure> {
        let samples = Self::samples(settings);
        let mut verdict = Verdict::new();
        verdict.exact(
            "detection position",
            &observed.output_lane(0),
            &Self::reference(&samples),
        );
        if settings.capture.is_none() {
            let found = observed.output.beat_count();
            verdict.property("synthesized preamble detections", found == 1, 1, found);
        }
        verdict.finish()
    }
}
