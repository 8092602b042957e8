//! Block FFT over framed tone pairs.

use wavesense_bfm::{Descriptor, Framing, StreamInterface};
use wavesense_config::{BackpressureConfig, PolicyKind};
use wavesense_common::IqSample;
use wavesense_golden::spectrum::peak_bins;
use wavesense_golden::{fft_fixed, Tolerance};
use wavesense_golden::synth::{quantize_iq, sum_of_complex_tones, Tone};
use wavesense_sim::Dut;

use super::{iq_beats, iq_pairs};
use crate::models::{BlockFft, StreamKernel, StreamStage};
use crate::report::Failure;
use crate::scenario::{Observed, Plan, Scenario};
use crate::settings::{ScenarioDefaults, ScenarioSettings};
use crate::verdict::Verdict;

const SIZE: usize = 64;
const BINS: [usize; 2] = [10, 15];

/// 64-point transforms of two complex tones, one block per input frame.
pub struct BlockFftScenario;

impl BlockFftScenario {
    /// One block per frame; each frame rotates the tones' starting phase.
    fn stimulus(frames: usize) -> Vec<IqSample> {
        (0..frames)
            .flat_map(|f| {
                let phase = f as f64 * 0.7;
                let tones = [
                    Tone {
                        frequency: BINS[0] as f64,
                        amplitude: 2000.0,
                        phase,
                    },
                    Tone {
                        frequency: BINS[1] as f64,
                        amplitude: 1000.0,
                        phase: -phase,
                    },
                ];
                quantize_iq(&sum_of_complex_tones(&tones, SIZE as f64, SIZE), 1.0)
            })
            .collect()
    }
}

impl Scenario for BlockFftScenario {
    fn name(&self) -> &str {
        "block_fft"
    }

    fn summary(&self) -> &str {
        "64-point block FFT with tlast framing"
    }

    fn defaults(&self) -> ScenarioDefaults {
        ScenarioDefaults {
            frames: 4,
            backpressure: BackpressureConfig {
                policy: PolicyKind::Random,
                p_ready: 0.5,
                windows: Vec::new(),
            },
            // One step of twiddle rounding.
            tolerance: Tolerance::new(1.0, 0.0),
            ..ScenarioDefaults::default()
        }
    }

    fn dut(&self, _settings: &ScenarioSettings) -> Box<dyn Dut> {
        Box::new(StreamStage::new(BlockFft::new(SIZE)))
    }

    fn input(&self) -> StreamInterface {
        BlockFft::new(SIZE).input()
    }

    fn output(&self) -> StreamInterface {
        BlockFft::new(SIZE).output()
    }

    fn plan(&self, settings: &ScenarioSettings) -> Result<Plan, Failure> {
        let samples = Self::stimulus(settings.frames);
        Ok(Plan::new(
            vec![Descriptor::Burst {
                beats: iq_beats(&samples),
                framing: Framing::Every(SIZE),
            }],
            (settings.frames * SIZE) as u64,
        )
        .with_frames(settings.frames))
    }

    fn check(
        &self,
        _plan: &Plan,
        observed: &Observed,
        settings: &ScenarioSettings,
    ) -> Result<(), Failure> {
        let samples = Self::stimulus(settings.frames);
        let expected: Vec<(i64, i64)> = iq_pairs(&samples)
            .chunks(SIZE)
            .flat_map(fft_fixed)
            .collect();
        let actual = observed.output_pairs();
        let mut verdict = Verdict::new();
        let re = |pairs: &[(i64, i64)]| pairs.iter().map(|p| p.0).collect::<Vec<_>>();
        let im = |pairs: &[(i64, i64)]| pairs.iter().map(|p| p.1).collect::<Vec<_>>();
        let tolerance = settings.tolerance;
        verdict.close("output re", &re(&actual), &re(&expected), tolerance);
        verdict.close("output im", &im(&actual), &im(&expected), tolerance);
        for (index, frame) in observed.output.closed().iter().enumerate() {
            let mags: Vec<f64> = frame
                .beats()
                .iter()
                .map(|b| (b[0] as f64).hypot(b[1] as f64))
                .collect();
            let mut peaks = peak_bins(&mags, BINS.len());
            peaks.sort_unstable();
            verdict.property(
                &format!("frame {index} peak bins"),
                peaks == BINS,
                format!("{BINS:?}"),
                format!("{peaks:?}"),
            );
            verdict.property(
                &format!("frame {index} length"),
                frame.len() == SIZE,
                SIZE,
                frame.len(),
            );
        }
        verdict.finish()
    }
}
