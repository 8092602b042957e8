//! Sliding cross-correlation against a known reference.

use num_complex::Complex64;

/// `out[i] = Σ_j s[i+j] · conj(ref[j])` for every full overlap,
/// `n - m + 1` values.
pub fn cross_correlate(samples: &[Complex64], reference: &[Complex64]) -> Vec<Complex64> {
    if reference.is_empty() || samples.len() < reference.len() {
        return Vec::new();
    }
    samples
        .windows(reference.len())
        .map(|w| w.iter().zip(reference).map(|(s, r)| s * r.conj()).sum())
        .collect()
}

/// Integer correlation of `(i, q)` pairs with each output component
/// arithmetically shifted right by `shift` bits, as a hardware correlator
/// truncates its accumulator.
pub fn cross_correlate_fixed(
    samples: &[(i64, i64)],
    reference: &[(i64, i64)],
    shift: u32,
) -> Vec<(i64, i64)> {
    if reference.is_empty() || samples.len() < reference.len() {
        return Vec::new();
    }
    samples
        .windows(reference.len())
        .map(|w| correlate_window(w, reference, shift))
        .collect()
}

/// One output of [`cross_correlate_fixed`] for a window of `reference.len()`
/// samples.
pub fn correlate_window(window: &[(i64, i64)], reference: &[(i64, i64)], shift: u32) -> (i64, i64) {
    let (mut re, mut im) = (0i64, 0i64);
    for (&(si, sq), &(ri, rq)) in window.iter().zip(reference) {
        // (si + j·sq)(ri - j·rq)
        re += si * ri + sq * rq;
        im += sq * ri - si * rq;
    }
    (re >> shift, im >> shift)
}

/// Positions of the largest value and of the largest value at least
/// `guard + 1` positions away from it, in ascending order.
pub fn two_largest_peaks(magnitudes: &[f64], guard: usize) -> Option<(usize, usize)> {
    let first = argmax(magnitudes.iter().copied().enumerate())?;
    let second = argmax(
        magnitudes
            .iter()
            .copied()
            .enumerate()
            .filter(|&(i, _)| i.abs_diff(first) > guard),
    )?;
    Some((first.min(second), first.max(second)))
}

fn argmax(values: impl Iterator<Item = (usize, f64)>) -> Option<usize> {
    values
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Whether two peaks are `period` apart within `slack` positions.
pub fn peaks_separated(peaks: (usize, usize), period: usize, slack: usize) -> bool {
    (peaks.1 - peaks.0).abs_diff(period) <= slack
}
