//! Bit-exact models of simple time-domain pipeline stages.

/// Output of a fixed delay line of `depth` stages fed with `input`.
///
/// The line emits nothing until it is full, so `n` inputs produce
/// `n - depth` outputs: the input sequence shifted by `depth` positions.
pub fn delay_line<T: Clone>(input: &[T], depth: usize) -> Vec<T> {
    input[..input.len().saturating_sub(depth)].to_vec()
}

/// `i² + q²` of every sample.
pub fn mag_squared(samples: &[(i64, i64)]) -> Vec<i64> {
    samples.iter().map(|&(i, q)| i * i + q * q).collect()
}
