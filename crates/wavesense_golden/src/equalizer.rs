//! Channel estimation and per-tone equalization for 64-bin OFDM symbols.
//!
//! Of the 64 bins, DC (bin 0) and the eleven guard bins 27..=37 carry no
//! data. The remaining 52 active bins are estimated and equalized; excluded
//! bins are reported as `None` and skipped by comparisons.

use num_complex::Complex64;

use crate::error::GoldenError;
use crate::synth::lts_bins;

/// Transform size.
pub const FFT_SIZE: usize = 64;

/// Number of active subcarriers.
pub const ACTIVE_BINS: usize = 52;

/// Whether `bin` carries data.
pub fn is_active_bin(bin: usize) -> bool {
    matches!(bin, 1..=26 | 38..=63)
}

/// Active bins in ascending order.
pub fn active_bins() -> impl Iterator<Item = usize> {
    (0..FFT_SIZE).filter(|&k| is_active_bin(k))
}

fn check_symbol(what: &'static str, symbol: &[Complex64]) -> Result<(), GoldenError> {
    if symbol.len() != FFT_SIZE {
        return Err(GoldenError::Length {
            what,
            expected: FFT_SIZE,
            actual: symbol.len(),
        });
    }
    Ok(())
}

/// Estimates the channel from the transforms of two received long training
/// symbols: `H_k = (Y1_k + Y2_k) / 2 · L_k` on active bins.
///
/// `L_k` is ±1 on active bins, so multiplying by it equals dividing by it.
pub fn estimate_channel(
    lts1: &[Complex64],
    lts2: &[Complex64],
) -> Result<Vec<Option<Complex64>>, GoldenError> {
    check_symbol("first training symbol", lts1)?;
    check_symbol("second training symbol", lts2)?;
    let reference = lts_bins();
    Ok((0..FFT_SIZE)
        .map(|k| {
            is_active_bin(k).then(|| (lts1[k] + lts2[k]) * 0.5 * reference[k])
        })
        .collect())
}

/// Re-inserts excluded bins into a channel estimate given only for the 52
/// active bins in ascending bin order.
pub fn expand_channel(active: &[Complex64]) -> Result<Vec<Option<Complex64>>, GoldenError> {
    if active.len() != ACTIVE_BINS {
        return Err(GoldenError::Length {
            what: "active channel estimate",
            expected: ACTIVE_BINS,
            actual: active.len(),
        });
    }
    let mut values = active.iter().copied();
    Ok((0..FFT_SIZE)
        .map(|k| if is_active_bin(k) { values.next() } else { None })
        .collect())
}

/// Divides each active bin of `symbol` by the channel estimate. Excluded bins
/// and bins with a zero estimate yield `None`.
pub fn equalize(
    symbol: &[Complex64],
    channel: &[Option<Complex64>],
) -> Result<Vec<Option<Complex64>>, GoldenError> {
    check_symbol("symbol", symbol)?;
    if channel.len() != FFT_SIZE {
        return Err(GoldenError::Length {
            what: "channel estimate",
            expected: FFT_SIZE,
            actual: channel.len(),
        });
    }
    Ok(symbol
        .iter()
        .zip(channel)
        .enumerate()
        .map(|(k, (&y, h))| match h {
            Some(h) if is_active_bin(k) && h.norm_sqr() > 0.0 => Some(y / h),
            _ => None,
        })
        .collect())
}
