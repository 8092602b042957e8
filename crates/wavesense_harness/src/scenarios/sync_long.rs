//! Long training symbol extraction under scripted backpressure.

use wavesense_bfm::{Descriptor, Framing, StreamInterface};
use wavesense_common::IqSample;
use wavesense_config::{BackpressureConfig, PolicyKind, WindowConfig};
use wavesense_golden::synth::{quantized_preamble, LTS_OFFSET};
use wavesense_golden::{cross_correlate_fixed, peaks_separated, two_largest_peaks};
use wavesense_sim::Dut;

use super::{iq_beats, iq_pairs, padded};
use crate::models::{LongPreambleSync, StreamKernel, StreamStage};
use crate::report::Failure;
use crate::scenario::{Observed, Plan, Scenario};
use crate::settings::{ScenarioDefaults, ScenarioSettings};
use crate::verdict::Verdict;

const PEAK: f64 = 8000.0;
/// Reference length: the first half of one long training symbol.
const REFERENCE_LEN: usize = 32;
/// Long training symbol length.
const PERIOD: usize = 64;
const SYMBOLS: usize = 2;
/// Start of the long training field's guard interval in the preamble.
const LONG_FIELD: usize = LTS_OFFSET - REFERENCE_LEN;
/// Zero samples around the synthesized long training field.
const LEAD: usize = 11;
const TAIL: usize = 169;

fn reference() -> Vec<(i64, i64)> {
    iq_pairs(&quantized_preamble(PEAK)[LTS_OFFSET..LTS_OFFSET + REFERENCE_LEN])
}

fn model() -> LongPreambleSync {
    LongPreambleSync::new(reference(), PERIOD, SYMBOLS)
}

/// Where the first training symbol starts: the earlier of the two largest
/// correlation peaks, which must sit one symbol apart with both symbols
/// inside the stimulus.
fn locate(samples: &[(i64, i64)]) -> Option<usize> {
    let mags: Vec<f64> = cross_correlate_fixed(samples, &reference(), 0)
        .iter()
        .map(|&(re, im)| (re as f64).hypot(im as f64))
        .collect();
    two_largest_peaks(&mags, REFERENCE_LEN)
        .filter(|&peaks| peaks_separated(peaks, PERIOD, 1))
        .map(|(first, _)| first)
        .filter(|&start| start + SYMBOLS * PERIOD <= samples.len())
}

/// Synchronizes on the long training field and forwards both training
/// symbols as two `last`-delimited frames.
pub struct SyncLongScenario;

impl SyncLongScenario {
    /// The preamble from its long training field on, as a capture that
    /// starts just after the short training field would be.
    fn samples(settings: &ScenarioSettings) -> Vec<IqSample> {
        match &settings.capture {
            Some(capture) => capture.clone(),
            None => padded(LEAD, &quantized_preamble(PEAK)[LONG_FIELD..], TAIL),
        }
    }
}

impl Scenario for SyncLongScenario {
    fn name(&self) -> &str {
        "sync_long"
    }

    fn summary(&self) -> &str {
        "long training symbol extraction into two 64-sample frames"
    }

    fn defaults(&self) -> ScenarioDefaults {
        let window = |ready, cycles| WindowConfig { ready, cycles };
        ScenarioDefaults {
            backpressure: BackpressureConfig {
                policy: PolicyKind::Scripted,
                p_ready: 1.0,
                windows: vec![
                    window(true, 100),
                    window(false, 100),
                    window(true, 15),
                    window(false, 49),
                    window(true, 17),
                    window(false, 49),
                    window(true, 12),
                    window(false, 49),
                ],
            },
            ..ScenarioDefaults::default()
        }
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
        if locate(&iq_pairs(&samples)).is_none() {
            return Err(Failure::Stimulus {
                message: "stimulus holds no pair of long training symbols".to_string(),
            });
        }
        Ok(Plan::new(
            vec![Descriptor::Burst {
                beats: iq_beats(&samples),
                framing: Framing::Never,
            }],
            (SYMBOLS * PERIOD) as u64,
        )
        .with_frames(SYMBOLS))
    }

    fn check(
        &self,
        _plan: &Plan,
        observed: &Observed,
        settings: &ScenarioSettings,
    ) -> Result<(), Failure> {
        let samples = iq_pairs(&Self::samples(settings));
        let mut verdict = Verdict::new();
        let Some(start) = locate(&samples) else {
            verdict.property("long training symbols located", false, "two peaks", "none");
            return verdict.finish();
        };
        let frames = observed.output.closed();
        for symbol in 0..SYMBOLS {
            let from = start + symbol * PERIOD;
            let expected = &samples[from..from + PERIOD];
            let (re, im): (Vec<i64>, Vec<i64>) = match frames.get(symbol) {
                Some(frame) => frame.beats().iter().map(|b| (b[0], b[1])).unzip(),
                None => (Vec::new(), Vec::new()),
            };
            let (want_re, want_im): (Vec<i64>, Vec<i64>) = expected.iter().copied().unzip();
            verdict.exact(&format!("symbol {symbol} i"), &re, &want_re);
            verdict.exact(&format!("symbol {symbol} q"), &im, &want_im);
        }
        if settings.capture.is_none() {
            let want = LEAD + REFERENCE_LEN;
            verdict.property("first symbol position", start == want, want, start);
        }
        verdict.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_symbols_are_located() {
        let samples = iq_pairs(&padded(LEAD, &quantized_preamble(PEAK)[LONG_FIELD..], TAIL));
        assert_eq!(samples.len(), 340);
        assert_eq!(locate(&samples), Some(43));
    }

    #[test]
    fn truncated_second_symbol_is_not_located() {
        let samples = iq_pairs(&quantized_preamble(PEAK)[LONG_FIELD..LONG_FIELD + 150]);
        assert_eq!(locate(&samples), None);
    }
}
