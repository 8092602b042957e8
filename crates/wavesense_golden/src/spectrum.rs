//! DFT magnitude spectra and the fixed-point block FFT reference.
//!
//! Bin `k` of an `N`-point transform at sample rate `fs` sits at `k·fs/N` for
//! `k <= N/2` and at `(k - N)·fs/N` above that, the usual DFT ordering.

use num_complex::Complex64;
use rustfft::FftPlanner;

/// Window applied before a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// No weighting.
    #[default]
    Rectangular,
    /// Periodic Hann window.
    Hann,
}

impl Window {
    /// Weight of sample `n` in an `len`-sample window.
    pub fn weight(self, n: usize, len: usize) -> f64 {
        match self {
            Self::Rectangular => 1.0,
            Self::Hann => {
                let phase = 2.0 * std::f64::consts::PI * n as f64 / len as f64;
                0.5 - 0.5 * phase.cos()
            }
        }
    }

    /// Weighted copy of `samples`.
    pub fn apply(self, samples: &[Complex64]) -> Vec<Complex64> {
        let len = samples.len();
        samples
            .iter()
            .enumerate()
            .map(|(n, &s)| s * self.weight(n, len))
            .collect()
    }
}

/// Forward DFT without normalization.
pub fn fft(samples: &[Complex64]) -> Vec<Complex64> {
    let mut buffer = samples.to_vec();
    if !buffer.is_empty() {
        FftPlanner::new()
            .plan_fft_forward(buffer.len())
            .process(&mut buffer);
    }
    buffer
}

/// Inverse DFT scaled by `1/N`.
pub fn ifft(spectrum: &[Complex64]) -> Vec<Complex64> {
    let mut buffer = spectrum.to_vec();
    if buffer.is_empty() {
        return buffer;
    }
    FftPlanner::new()
        .plan_fft_inverse(buffer.len())
        .process(&mut buffer);
    let scale = 1.0 / buffer.len() as f64;
    buffer.iter_mut().for_each(|x| *x *= scale);
    buffer
}

/// `sqrt(re² + im²)` of every bin.
pub fn magnitudes(spectrum: &[Complex64]) -> Vec<f64> {
    spectrum.iter().map(|x| x.norm()).collect()
}

/// Magnitude spectrum of windowed complex samples.
pub fn magnitude_spectrum(samples: &[Complex64], window: Window) -> Vec<f64> {
    magnitudes(&fft(&window.apply(samples)))
}

/// Magnitudes of the non-negative-frequency bins `0..=N/2` of a real signal.
pub fn real_magnitude_spectrum(samples: &[f64]) -> Vec<f64> {
    let complex: Vec<Complex64> = samples.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    let mut mags = magnitudes(&fft(&complex));
    mags.truncate(samples.len() / 2 + 1);
    mags
}

/// Center frequency of every bin in DFT order.
pub fn bin_frequencies(len: usize, sample_rate: f64) -> Vec<f64> {
    let n = len as f64;
    (0..len)
        .map(|k| {
            let k = if k <= len / 2 { k as f64 } else { k as f64 - n };
            k * sample_rate / n
        })
        .collect()
}

/// The bin nearest to `frequency` (negative frequencies wrap).
pub fn frequency_bin(frequency: f64, len: usize, sample_rate: f64) -> usize {
    let k = (frequency * len as f64 / sample_rate).round() as i64;
    k.rem_euclid(len as i64) as usize
}

/// Indices of the `count` largest values, largest first.
pub fn peak_bins(magnitudes: &[f64], count: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..magnitudes.len()).collect();
    order.sort_by(|&a, &b| magnitudes[b].total_cmp(&magnitudes[a]).then(a.cmp(&b)));
    order.truncate(count);
    order
}

/// Block FFT as computed by scaled fixed-point hardware: the forward DFT
/// divided by `N`, each component rounded to the nearest integer.
pub fn fft_fixed(block: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let input: Vec<Complex64> = block
        .iter()
        .map(|&(i, q)| Complex64::new(i as f64, q as f64))
        .collect();
    let scale = 1.0 / block.len().max(1) as f64;
    fft(&input)
        .into_iter()
        .map(|x| ((x.re * scale).round() as i64, (x.im * scale).round() as i64))
        .collect()
}
