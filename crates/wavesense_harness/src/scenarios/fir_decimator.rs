//! Decimating FIR filter: bit-exact output plus a spectral passband check.

use std::f64::consts::PI;

use wavesense_bfm::{Descriptor, Framing, StreamInterface};
use wavesense_config::{BackpressureConfig, PolicyKind};
use wavesense_golden::{
    fir_decimate, lowpass_kernel, passband_comparison, quantize_kernel, RateRatio, Tolerance,
};
use wavesense_sim::Dut;

use crate::models::{FirDecimator, StreamKernel, StreamStage};
use crate::report::Failure;
use crate::scenario::{Observed, Plan, Scenario};
use crate::settings::{ScenarioDefaults, ScenarioSettings};
use crate::verdict::Verdict;

const F_IN: u64 = 120_000_000;
const F_OUT: u64 = 20_000_000;
const TAPS: usize = 17;
const FRAC_BITS: u32 = 15;
/// Fraction of the output Nyquist band compared spectrally.
const PASSBAND: f64 = 0.8;

fn taps() -> Vec<i64> {
    quantize_kernel(&lowpass_kernel(TAPS, 0.5 * F_OUT as f64 / F_IN as f64), FRAC_BITS)
}

fn model() -> FirDecimator {
    FirDecimator::new(taps(), FRAC_BITS, F_IN, F_OUT)
}

/// Two in-band tones at 120 MHz, decimated to 20 MHz.
fn two_tones(n: usize) -> Vec<i64> {
    (0..n)
        .map(|t| {
            let t = t as f64 / F_IN as f64;
            let a = 4000.0 * (2.0 * PI * 1.2e6 * t).sin();
            let b = 3000.0 * (2.0 * PI * 2.4e6 * t).cos();
            (a + b).round() as i64
        })
        .collect()
}

/// 17-tap low-pass with a 6:1 phase-accumulator decimator.
pub struct FirDecimatorScenario;

impl FirDecimatorScenario {
    fn ratio() -> Result<RateRatio, Failure> {
        RateRatio::new(F_IN, F_OUT).map_err(|e| Failure::Stimulus { message: e.to_string() })
    }
}

impl Scenario for FirDecimatorScenario {
    fn name(&self) -> &str {
        "fir_decimator"
    }

    fn summary(&self) -> &str {
        "FIR decimation 120 MHz to 20 MHz, bit-exact and passband spectrum"
    }

    fn defaults(&self) -> ScenarioDefaults {
        ScenarioDefaults {
            samples: 3000,
            cycle_budget: 40_000,
            backpressure: BackpressureConfig {
                policy: PolicyKind::Random,
                p_ready: 0.5,
                windows: Vec::new(),
            },
            tolerance: Tolerance::new(200.0, 0.2),
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
        let x = two_tones(settings.samples);
        let flush = vec![0; TAPS];
        let expected = Self::ratio()?.output_count(x.len()) as u64;
        Ok(Plan::new(
            vec![
                Descriptor::from_columns(&[x.as_slice()], Framing::Never),
                Descriptor::from_columns(&[flush.as_slice()], Framing::Never),
            ],
            expected,
        ))
    }

    fn check(
        &self,
        plan: &Plan,
        observed: &Observed,
        settings: &ScenarioSettings,
    ) -> Result<(), Failure> {
        let mut x: Vec<i64> = plan.beats().into_iter().map(|b| b[0]).collect();
        x.truncate(x.len().saturating_sub(TAPS));
        let y = observed.output_lane(0);
        let mut verdict = Verdict::new();
        verdict.exact("output data", &y, &fir_decimate(&x, &taps(), FRAC_BITS, Self::ratio()?));
        verdict.record(
            "passband magnitude",
            passband_comparison(&x, &y, PASSBAND, settings.tolerance),
        );
        verdict.finish()
    }
}
