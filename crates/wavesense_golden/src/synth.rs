//! Stimulus synthesis: tones, ramps, and the 802.11 legacy preamble.

use num_complex::Complex64;
use wavesense_common::IqSample;

use crate::spectrum::ifft;

/// One sinusoidal component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    /// Frequency in Hz (negative for complex tones below DC).
    pub frequency: f64,
    /// Peak amplitude.
    pub amplitude: f64,
    /// Initial phase in radians.
    pub phase: f64,
}

impl Tone {
    /// A zero-phase tone.
    pub fn new(frequency: f64, amplitude: f64) -> Self {
        Self {
            frequency,
            amplitude,
            phase: 0.0,
        }
    }

    fn angle(&self, n: usize, sample_rate: f64) -> f64 {
        2.0 * std::f64::consts::PI * self.frequency * n as f64 / sample_rate + self.phase
    }
}

/// Real sum of cosines.
pub fn sum_of_tones(tones: &[Tone], sample_rate: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| {
            tones
                .iter()
                .map(|t| t.amplitude * t.angle(n, sample_rate).cos())
                .sum()
        })
        .collect()
}

/// Complex sum of exponentials `A·e^{jθ}`.
pub fn sum_of_complex_tones(tones: &[Tone], sample_rate: f64, len: usize) -> Vec<Complex64> {
    (0..len)
        .map(|n| {
            tones
                .iter()
                .map(|t| Complex64::from_polar(t.amplitude, t.angle(n, sample_rate)))
                .sum()
        })
        .collect()
}

/// Rounds to the nearest integer and saturates to the `i16` range.
pub fn quantize(value: f64) -> i16 {
    value.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// Scales complex samples by `scale` and quantizes both components.
pub fn quantize_iq(samples: &[Complex64], scale: f64) -> Vec<IqSample> {
    samples
        .iter()
        .map(|s| IqSample {
            i: quantize(s.re * scale),
            q: quantize(s.im * scale),
        })
        .collect()
}

/// `0, 1, …, period-1, 0, 1, …` for `len` samples.
pub fn ramp(period: i64, len: usize) -> Vec<i64> {
    (0..len as i64).map(|n| n.rem_euclid(period.max(1))).collect()
}

/// `pattern` repeated `times` times.
pub fn repeat<T: Clone>(pattern: &[T], times: usize) -> Vec<T> {
    pattern
        .iter()
        .cloned()
        .cycle()
        .take(pattern.len() * times)
        .collect()
}

// Subcarrier values for k = -26..=26.
const STS_SIGNS: [i8; 53] = [
    0, 0, 1, 0, 0, 0, -1, 0, 0, 0, 1, 0, 0, 0, -1, 0, 0, 0, -1, 0, 0, 0, 1, 0, 0, 0, 0,
    0, 0, 0, -1, 0, 0, 0, -1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0,
];

const LTS_SIGNS: [i8; 53] = [
    1, 1, -1, -1, 1, 1, -1, 1, -1, 1, 1, 1, 1, 1, 1, -1, -1, 1, 1, -1, 1, -1, 1, 1, 1, 1,
    0, 1, -1, -1, 1, 1, -1, 1, -1, 1, -1, -1, -1, -1, -1, 1, 1, -1, -1, 1, -1, 1, -1, 1, 1,
    1, 1,
];

fn to_bins(signs: &[i8; 53]) -> [f64; 64] {
    let mut bins = [0.0; 64];
    for (index, &s) in signs.iter().enumerate() {
        let k = index as i64 - 26;
        bins[k.rem_euclid(64) as usize] = f64::from(s);
    }
    bins
}

/// Long training symbol subcarrier values `L_k` in DFT bin order.
pub fn lts_bins() -> [f64; 64] {
    to_bins(&LTS_SIGNS)
}

/// Short training symbol subcarrier values in DFT bin order.
pub fn sts_bins() -> [Complex64; 64] {
    let scale = (13.0f64 / 6.0).sqrt();
    to_bins(&STS_SIGNS).map(|s| Complex64::new(s, s) * scale)
}

/// One 64-sample long training symbol in the time domain.
pub fn lts_time() -> Vec<Complex64> {
    let bins: Vec<Complex64> = lts_bins().iter().map(|&v| Complex64::new(v, 0.0)).collect();
    ifft(&bins)
}

/// One 16-sample short training period in the time domain.
pub fn sts_time() -> Vec<Complex64> {
    let mut symbol = ifft(&sts_bins());
    symbol.truncate(16);
    symbol
}

/// The 320-sample legacy preamble: ten short periods, a 32-sample guard
/// interval, and two long training symbols.
pub fn legacy_preamble() -> Vec<Complex64> {
    let sts = sts_time();
    let lts = lts_time();
    let mut out = repeat(&sts, 10);
    out.extend_from_slice(&lts[32..]);
    out.extend_from_slice(&lts);
    out.extend_from_slice(&lts);
    out
}

/// Offset of the first long training symbol inside [`legacy_preamble`].
pub const LTS_OFFSET: usize = 192;

/// [`legacy_preamble`] quantized so that its largest component is `peak`.
pub fn quantized_preamble(peak: f64) -> Vec<IqSample> {
    let preamble = legacy_preamble();
    let largest = preamble
        .iter()
        .map(|s| s.re.abs().max(s.im.abs()))
        .fold(0.0, f64::max);
    quantize_iq(&preamble, peak / largest)
}
