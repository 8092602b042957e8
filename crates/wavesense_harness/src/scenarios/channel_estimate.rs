//! Channel estimation from pairs of long training symbol transforms.
//!
//! Each pair carries `Y_k = H_k·L_k + n_k` for a fixed multipath channel
//! `H_k` and small seeded noise. The estimate is checked against the
//! floating reference within `atol`, then used to equalize the first symbol
//! of its pair, which must give back the training values.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wavesense_bfm::{Descriptor, Framing, StreamInterface};
use wavesense_golden::equalizer::{
    equalize, estimate_channel, expand_channel, is_active_bin, ACTIVE_BINS, FFT_SIZE,
};
use wavesense_golden::synth::lts_bins;
use wavesense_golden::{compare_close_masked, Complex64, Tolerance};
use wavesense_sim::Dut;

use crate::models::{ChannelEstimator, StreamKernel, StreamStage};
use crate::report::Failure;
use crate::scenario::{Observed, Plan, Scenario};
use crate::settings::{ScenarioDefaults, ScenarioSettings};
use crate::verdict::Verdict;

const AMPLITUDE: f64 = 3000.0;
const NOISE: i64 = 8;
/// Tolerance of the equalized training values.
const EQUALIZED: Tolerance = Tolerance { atol: 0.05, rtol: 0.0 };

/// `H_k`: a three-sample delay with a gentle magnitude ripple.
fn channel(bin: usize) -> Complex64 {
    let k = bin as f64;
    let ripple = 1.0 - 0.2 * (2.0 * PI * k / 64.0).cos();
    Complex64::from_polar(AMPLITUDE * ripple, -2.0 * PI * 3.0 * k / 64.0)
}

/// Received training symbol transforms, two per pair.
fn symbols(seed: u64, pairs: usize) -> Vec<Vec<(i64, i64)>> {
    let training = lts_bins();
    let mut rng = StdRng::seed_from_u64(seed);
    (0..pairs * 2)
        .map(|_| {
            (0..FFT_SIZE)
                .map(|k| {
                    if !is_active_bin(k) {
                        return (0, 0);
                    }
                    let y = channel(k) * training[k];
                    (
                        y.re.round() as i64 + rng.gen_range(-NOISE..=NOISE),
                        y.im.round() as i64 + rng.gen_range(-NOISE..=NOISE),
                    )
                })
                .collect()
        })
        .collect()
}

fn to_complex(pairs: &[(i64, i64)]) -> Vec<Complex64> {
    pairs
        .iter()
        .map(|&(re, im)| Complex64::new(re as f64, im as f64))
        .collect()
}

/// Least-squares channel estimate and equalization.
pub struct ChannelEstimateScenario;

impl Scenario for ChannelEstimateScenario {
    fn name(&self) -> &str {
        "channel_estimate"
    }

    fn summary(&self) -> &str {
        "channel estimation on 52 active bins, checked by equalization"
    }

    fn defaults(&self) -> ScenarioDefaults {
        ScenarioDefaults {
            frames: 2,
            tolerance: Tolerance::new(1.0, 0.0),
            ..ScenarioDefaults::default()
        }
    }

    fn dut(&self, _settings: &ScenarioSettings) -> Box<dyn Dut> {
        Box::new(StreamStage::new(ChannelEstimator::new()))
    }

    fn input(&self) -> StreamInterface {
        ChannelEstimator::new().input()
    }

    fn output(&self) -> StreamInterface {
        ChannelEstimator::new().output()
    }

    fn plan(&self, settings: &ScenarioSettings) -> Result<Plan, Failure> {
        let beats = symbols(settings.seed, settings.frames)
            .into_iter()
            .flatten()
            .map(|(re, im)| vec![re, im])
            .collect();
        Ok(Plan::new(
            vec![Descriptor::Burst {
                beats,
                framing: Framing::Every(FFT_SIZE),
            }],
            (settings.frames * ACTIVE_BINS) as u64,
        )
        .with_frames(settings.frames))
    }

    fn check(
        &self,
        _plan: &Plan,
        observed: &Observed,
        settings: &ScenarioSettings,
    ) -> Result<(), Failure> {
        let invalid = |e: wavesense_golden::GoldenError| Failure::Stimulus {
            message: e.to_string(),
        };
        let symbols = symbols(settings.seed, settings.frames);
        let training: Vec<Complex64> = lts_bins().iter().map(|&v| Complex64::new(v, 0.0)).collect();
        let mut verdict = Verdict::new();
        for (pair, frame) in symbols.chunks(2).zip(observed.output.closed()) {
            let (y1, y2) = (to_complex(&pair[0]), to_complex(&pair[1]));
            let expected: Vec<Complex64> = estimate_channel(&y1, &y2)
                .map_err(invalid)?
                .into_iter()
                .flatten()
                .collect();
            let actual: Vec<Complex64> = frame
                .beats()
                .iter()
                .map(|b| Complex64::new(b[0] as f64, b[1] as f64))
                .collect();
            verdict.close("channel estimate", &actual, &expected, settings.tolerance);

            if actual.len() != ACTIVE_BINS {
                continue;
            }
            let estimate = expand_channel(&actual).map_err(invalid)?;
            let equalized: Vec<Complex64> = equalize(&y1, &estimate)
                .map_err(invalid)?
                .into_iter()
                .map(|v| v.unwrap_or_default())
                .collect();
            verdict.record(
                "equalized training",
                compare_close_masked(&equalized, &training, EQUALIZED, is_active_bin),
            );
        }
        verdict.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_fit_sixteen_bits() {
        let all = symbols(1, 3);
        assert_eq!(all.len(), 6);
        for symbol in &all {
            assert_eq!(symbol.len(), FFT_SIZE);
            assert!(symbol.iter().all(|&(re, im)| re.abs() < 4000 && im.abs() < 4000));
            assert_eq!(symbol[0], (0, 0));
        }
        assert_eq!(symbols(1, 3), all);
    }
}
