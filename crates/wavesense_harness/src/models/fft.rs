//! Block FFT.

use std::f64::consts::PI;

use wavesense_bfm::StreamInterface;
use wavesense_sim::SimError;

use super::{complex_fields, packed_iq, split_complex, OutputBeat, StreamKernel};

/// Fractional bits of the twiddle table.
const TWIDDLE_BITS: u32 = 30;

/// Collects blocks of `size` complex samples and emits each block's scaled
/// transform, `last` on the final bin. Input `last` is ignored: blocks are
/// delimited by count.
///
/// The transform is an integer DFT against a Q30 twiddle table, divided by
/// `size` and rounded half away from zero.
#[derive(Debug, Clone)]
pub struct BlockFft {
    size: usize,
    twiddles: Vec<(i64, i64)>,
    block: Vec<(i64, i64)>,
}

impl BlockFft {
    /// A transform of `size` points.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            twiddles: (0..size).map(|m| twiddle(m, size)).collect(),
            size,
            block: Vec::with_capacity(size),
        }
    }

    fn transform(&self) -> Vec<(i64, i64)> {
        let n = self.size;
        let scale = (n as i128) << TWIDDLE_BITS;
        (0..n)
            .map(|k| {
                let (mut re, mut im) = (0i128, 0i128);
                for (t, &(a, b)) in self.block.iter().enumerate() {
                    let (c, d) = self.twiddles[(k * t) % n];
                    let (a, b, c, d) = (
                        i128::from(a),
                        i128::from(b),
                        i128::from(c),
                        i128::from(d),
                    );
                    re += a * c - b * d;
                    im += a * d + b * c;
                }
                (round_div(re, scale), round_div(im, scale))
            })
            .collect()
    }
}

/// `exp(-j·2π·m/n)` in Q30, exact on the axes.
fn twiddle(m: usize, n: usize) -> (i64, i64) {
    let one = 1i64 << TWIDDLE_BITS;
    match (4 * m) % (4 * n) {
        0 => return (one, 0),
        q if q == n => return (0, -one),
        q if q == 2 * n => return (-one, 0),
        q if q == 3 * n => return (0, one),
        _ => {}
    }
    let angle = -2.0 * PI * m as f64 / n as f64;
    let scale = one as f64;
    ((angle.cos() * scale).round() as i64, (angle.sin() * scale).round() as i64)
}

fn round_div(num: i128, den: i128) -> i64 {
    let q = (num.abs() + den / 2) / den;
    (if num < 0 { -q } else { q }) as i64
}

impl StreamKernel for BlockFft {
    fn name(&self) -> &str {
        "block_fft"
    }

    fn input(&self) -> StreamInterface {
        packed_iq("s_axis").with_last()
    }

    fn output(&self) -> StreamInterface {
        split_complex("m_axis", 32).with_last()
    }

    fn reset(&mut self) {
        self.block.clear();
    }

    fn process(
        &mut self,
        fields: &[i64],
        _last: bool,
        out: &mut Vec<OutputBeat>,
    ) -> Result<(), SimError> {
        self.block.push(complex_fields(fields));
        if self.block.len() < self.size {
            return Ok(());
        }
        let bins = self.transform();
        self.block.clear();
        let count = bins.len();
        out.extend(bins.into_iter().enumerate().map(|(k, (re, im))| OutputBeat {
            fields: vec![re, im],
            last: k + 1 == count,
        }));
        Ok(())
    }
}
