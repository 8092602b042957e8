//! Fixed-point FIR decimation.
//!
//! Each input sample `x[k]` produces one full-rate output
//! `y[k] = Σ h[j]·x[k-j]`, with samples before the burst taken as zero. Rate
//! conversion uses a phase accumulator:
//! each full-rate output adds `f_out`, and an output is kept whenever the
//! accumulator reaches `f_in`. The kept count is therefore
//! `floor(n · f_out / f_in)` for any ratio, integer or not.

use num_complex::Complex64;

use crate::compare::{compare_close, Comparison, Tolerance};
use crate::error::GoldenError;
use crate::spectrum::{fft, magnitudes, Window};

/// Windowed-sinc low-pass kernel with a Hamming window and unity DC gain.
///
/// `cutoff` is in cycles per sample (`0 < cutoff < 0.5`).
pub fn lowpass_kernel(taps: usize, cutoff: f64) -> Vec<f64> {
    let span = taps.saturating_sub(1).max(1) as f64;
    let center = span / 2.0;
    let raw: Vec<f64> = (0..taps)
        .map(|j| {
            let x = j as f64 - center;
            let sinc = if x == 0.0 {
                2.0 * cutoff
            } else {
                (2.0 * std::f64::consts::PI * cutoff * x).sin() / (std::f64::consts::PI * x)
            };
            let window = 0.54 - 0.46 * (2.0 * std::f64::consts::PI * j as f64 / span).cos();
            sinc * window
        })
        .collect();
    let gain: f64 = raw.iter().sum();
    raw.into_iter().map(|h| h / gain).collect()
}

/// Rounds a kernel to integers with `frac_bits` fractional bits.
pub fn quantize_kernel(kernel: &[f64], frac_bits: u32) -> Vec<i64> {
    let scale = (1u64 << frac_bits) as f64;
    kernel.iter().map(|h| (h * scale).round() as i64).collect()
}

/// Rate-conversion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateRatio {
    /// Input sample rate.
    pub f_in: u64,
    /// Output sample rate.
    pub f_out: u64,
}

impl RateRatio {
    /// Validates `0 < f_out <= f_in`.
    pub fn new(f_in: u64, f_out: u64) -> Result<Self, GoldenError> {
        if f_out == 0 || f_out > f_in {
            return Err(GoldenError::Parameter {
                name: "f_out",
                reason: format!("must be in 1..={f_in}, got {f_out}"),
            });
        }
        Ok(Self { f_in, f_out })
    }

    /// Number of outputs kept from `n` full-rate samples.
    pub fn output_count(&self, n: usize) -> usize {
        ((n as u128 * u128::from(self.f_out)) / u128::from(self.f_in)) as usize
    }
}

/// Phase accumulator deciding which full-rate outputs to keep.
#[derive(Debug, Clone)]
pub struct Decimator {
    ratio: RateRatio,
    phase: u64,
}

impl Decimator {
    /// Starts with an empty accumulator.
    pub fn new(ratio: RateRatio) -> Self {
        Self { ratio, phase: 0 }
    }

    /// Advances by one full-rate sample; returns `true` if it is kept.
    pub fn tick(&mut self) -> bool {
        self.phase += self.ratio.f_out;
        if self.phase >= self.ratio.f_in {
            self.phase -= self.ratio.f_in;
            true
        } else {
            false
        }
    }
}

/// Dot product of `taps` with a window whose newest sample is `window[T-1]`,
/// rounded back to integer with `frac_bits` fractional bits.
pub fn fir_point(taps: &[i64], window: &[i64], frac_bits: u32) -> i64 {
    let newest = window.len() - 1;
    let acc: i64 = taps
        .iter()
        .enumerate()
        .map(|(j, &h)| h * window[newest - j])
        .sum();
    round_shift(acc, frac_bits)
}

fn round_shift(acc: i64, frac_bits: u32) -> i64 {
    if frac_bits == 0 {
        acc
    } else {
        (acc + (1 << (frac_bits - 1))) >> frac_bits
    }
}

/// Filters `samples` from zero history and decimates by `ratio`.
pub fn fir_decimate(
    samples: &[i64],
    taps: &[i64],
    frac_bits: u32,
    ratio: RateRatio,
) -> Vec<i64> {
    let t = taps.len();
    if t == 0 {
        return Vec::new();
    }
    let mut history = vec![0; t - 1];
    history.extend_from_slice(samples);
    let mut decimator = Decimator::new(ratio);
    let mut out = Vec::with_capacity(ratio.output_count(samples.len()));
    for k in 0..samples.len() {
        let full = fir_point(taps, &history[k..k + t], frac_bits);
        if decimator.tick() {
            out.push(full);
        }
    }
    out
}

/// Hann-windowed magnitudes of the non-negative bins of a real sequence.
fn windowed_real_spectrum(samples: &[i64]) -> Vec<f64> {
    let complex: Vec<Complex64> = samples
        .iter()
        .map(|&x| Complex64::new(x as f64, 0.0))
        .collect();
    let mut mags = magnitudes(&fft(&Window::Hann.apply(&complex)));
    mags.truncate(samples.len() / 2 + 1);
    mags
}

/// Compares the output spectrum with the input spectrum scaled by
/// `len(output)/len(input)` over the bins below `passband` times the output
/// Nyquist frequency.
///
/// When both lengths are whole multiples of the tone periods, input bin `k`
/// and output bin `k` sit at the same frequency, so a correct decimator
/// reproduces the passband magnitudes up to the filter's ripple.
pub fn passband_comparison(
    input: &[i64],
    output: &[i64],
    passband: f64,
    tolerance: Tolerance,
) -> Comparison<f64> {
    let scale = output.len() as f64 / input.len().max(1) as f64;
    let edge = (passband * output.len() as f64 / 2.0).floor() as usize;
    let expected: Vec<f64> = windowed_real_spectrum(input)
        .into_iter()
        .take(edge + 1)
        .map(|m| m * scale)
        .collect();
    let actual: Vec<f64> = windowed_real_spectrum(output)
        .into_iter()
        .take(edge + 1)
        .collect();
    compare_close(&actual, &expected, tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_has_unity_gain_and_symmetry() {
        let h = lowpass_kernel(17, 1.0 / 12.0);
        assert_eq!(h.len(), 17);
        assert!((h.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for j in 0..8 {
            assert!((h[j] - h[16 - j]).abs() < 1e-12);
        }
        assert!(h[8] > h[7]);
    }

    #[test]
    fn quantized_kernel() {
        let q = quantize_kernel(&lowpass_kernel(17, 1.0 / 12.0), 15);
        assert_eq!(
            q,
            vec![
                -95, -90, 0, 399, 1282, 2617, 4109, 5291, 5742, 5291, 4109, 2617, 1282, 399, 0,
                -90, -95
            ]
        );
        assert_eq!(q.iter().sum::<i64>(), 32768);
    }

    #[test]
    fn rate_ratio_validation() {
        assert!(RateRatio::new(100, 0).is_err());
        assert!(RateRatio::new(100, 101).is_err());
        assert!(RateRatio::new(100, 100).is_ok());
    }

    #[test]
    fn output_count_is_floor_of_ratio() {
        let ratio = RateRatio::new(122_880_000, 20_000_000).unwrap();
        assert_eq!(ratio.output_count(10_000), 1627);
        let taps = quantize_kernel(&lowpass_kernel(17, 0.08), 15);
        let x = vec![100; 10_000];
        assert_eq!(fir_decimate(&x, &taps, 15, ratio).len(), 1627);
    }

    #[test]
    fn decimator_keeps_every_mth_for_integer_ratio() {
        let mut d = Decimator::new(RateRatio::new(6, 1).unwrap());
        let positions: Vec<usize> = (0..20).filter(|_| d.tick()).collect();
        assert_eq!(positions, vec![5, 11, 17]);
    }

    #[test]
    fn dc_passes_unchanged() {
        let taps = quantize_kernel(&lowpass_kernel(17, 1.0 / 12.0), 15);
        let ratio = RateRatio::new(120, 20).unwrap();
        let out = fir_decimate(&vec![1000; 120], &taps, 15, ratio);
        assert_eq!(out.len(), 20);
        // Kept positions 5 and 11 still overlap the zero history.
        assert_eq!(&out[..2], &[126, 954]);
        assert!(out[2..].iter().all(|&y| y == 1000));
    }

    #[test]
    fn impulse_reproduces_taps() {
        let taps = vec![1, 2, 3];
        let ratio = RateRatio::new(1, 1).unwrap();
        let out = fir_decimate(&[0, 5, 0, 0, 0], &taps, 0, ratio);
        assert_eq!(out, vec![0, 5, 10, 15, 0]);
    }

    #[test]
    fn first_sample_contributes_to_first_output() {
        let ratio = RateRatio::new(1, 1).unwrap();
        let out = fir_decimate(&[7, 0, 0, 0, 0], &[1, 2, 3], 0, ratio);
        assert_eq!(out, vec![7, 14, 21, 0, 0]);
    }

    #[test]
    fn passband_matches_scaled_input() {
        let (f_in, f_out) = (120_000_000u64, 20_000_000u64);
        let n = 3000;
        let x: Vec<i64> = (0..n)
            .map(|t| {
                let t = t as f64 / f_in as f64;
                let a = 4000.0 * (2.0 * std::f64::consts::PI * 1.2e6 * t).sin();
                let b = 3000.0 * (2.0 * std::f64::consts::PI * 2.4e6 * t).cos();
                (a + b).round() as i64
            })
            .collect();
        let taps = quantize_kernel(&lowpass_kernel(17, 0.5 * f_out as f64 / f_in as f64), 15);
        let y = fir_decimate(&x, &taps, 15, RateRatio::new(f_in, f_out).unwrap());
        assert_eq!(y.len(), 500);
        let cmp = passband_comparison(&x, &y, 0.8, Tolerance::new(200.0, 0.2));
        assert_eq!(cmp.compared, 201);
        assert!(
            cmp.mismatches.is_empty(),
            "{:?}",
            &cmp.mismatches[..cmp.mismatches.len().min(4)]
        );
    }

    #[test]
    fn passband_flags_a_dead_filter() {
        let x: Vec<i64> = (0..600)
            .map(|t| {
                let phase = 2.0 * std::f64::consts::PI * t as f64 / 60.0;
                (4000.0 * phase.sin()).round() as i64
            })
            .collect();
        let silent = vec![0; 100];
        let cmp = passband_comparison(&x, &silent, 0.8, Tolerance::new(200.0, 0.2));
        assert!(!cmp.mismatches.is_empty());
    }
}
