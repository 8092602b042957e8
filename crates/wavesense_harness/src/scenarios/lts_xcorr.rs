//! Long training symbol correlation with a peak spacing property.

use wavesense_bfm::{Descriptor, Framing, StreamInterface};
use wavesense_common::IqSample;
use wavesense_golden::synth::{quantized_preamble, LTS_OFFSET};
use wavesense_golden::{cross_correlate_fixed, peaks_separated, two_largest_peaks};
use wavesense_sim::Dut;

use super::{iq_beats, iq_pairs, padded};
use crate::models::{LtsCorrelator, StreamKernel, StreamStage};
use crate::report::Failure;
use crate::scenario::{Observed, Plan, Scenario};
use crate::settings::{ScenarioDefaults, ScenarioSettings};
use crate::verdict::Verdict;

const PEAK: f64 = 8000.0;
/// Reference length: the first half of one long training symbol.
const REFERENCE_LEN: usize = 32;
const SHIFT: u32 = 4;
/// Long training symbol period.
const PERIOD: usize = 64;

fn reference() -> Vec<(i64, i64)> {
    iq_pairs(&quantized_preamble(PEAK)[LTS_OFFSET..LTS_OFFSET + REFERENCE_LEN])
}

fn model() -> LtsCorrelator {
    LtsCorrelator::new(reference(), SHIFT)
}

/// Sliding correlation against the long training symbol; the two largest
/// peaks must sit one symbol apart.
pub struct LtsXcorrScenario;

impl LtsXcorrScenario {
    fn samples(settings: &ScenarioSettings) -> Vec<IqSample> {
        match &settings.capture {
            Some(capture) => capture.clone(),
            None => padded(100, &quantized_preamble(PEAK), 80),
        }
    }
}

impl Scenario for LtsXcorrScenario {
    fn name(&self) -> &str {
        "lts_xcorr"
    }

    fn summary(&self) -> &str {
        "long training symbol cross-correlation and peak spacing"
    }

    fn defaults(&self) -> ScenarioDefaults {
        ScenarioDefaults::default()
    }

    fn dut(&self, _settings: &ScenarioSettings) -> Box<dyn Dut> {
        Box::new(StreamStage::new(model()))
    }

    fn input(&self) -> StreamInterface {
        model().input()
    }

    fn output(&self) -> StreamInterface {
        model().output()
    }

    fn plan(&self, settings: &ScenarioSettings) -> Result<Plan, Failure> {
        let samples = Self::samples(settings);
        let outputs = samples.len().saturating_sub(REFERENCE_LEN - 1) as u64;
        Ok(Plan::new(
            vec![Descriptor::Burst {
                beats: iq_beats(&samples),
                framing: Framing::Never,
            }],
            outputs,
        ))
    }

    fn check(
        &self,
        _plan: &Plan,
        observed: &Observed,
        settings: &ScenarioSettings,
    ) -> Result<(), Failure> {
        let samples = iq_pairs(&Self::samples(settings));
        let expected = cross_correlate_fixed(&samples, &reference(), SHIFT);
        let mut verdict = Verdict::new();
        let (re, im): (Vec<i64>, Vec<i64>) = expected.into_iter().unzip();
        verdict.exact("correlation re", &observed.output_lane(0), &re);
        verdict.exact("correlation im", &observed.output_lane(1), &im);

        let mags: Vec<f64> = observed
            .output_pairs()
            .iter()
            .map(|&(re, im)| (re as f64).hypot(im as f64))
            .collect();
        let peaks = two_largest_peaks(&mags, REFERENCE_LEN);
        verdict.property(
            "peak spacing",
            peaks.is_some_and(|p| peaks_separated(p, PERIOD, 1)),
            format!("{PERIOD} ± 1"),
            match peaks {
                Some((a, b)) => format!("{} (peaks at {a} and {b})", b - a),
                None => "fewer than two peaks".to_string(),
            },
        );
        verdict.finish()
    }
}
