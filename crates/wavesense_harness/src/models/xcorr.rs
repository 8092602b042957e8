//! Long training symbol cross-correlator.

use std::collections::VecDeque;

use wavesense_bfm::StreamInterface;
use wavesense_sim::SimError;

use super::{complex_fields, packed_iq, split_complex, OutputBeat, StreamKernel};

/// Sliding correlation of the input against a fixed complex reference.
///
/// Produces one output per input once `reference.len()` samples have been
/// seen: the window multiplied by the conjugated reference and accumulated,
/// each component then shifted right by `shift` bits.
#[derive(Debug, Clone)]
pub struct LtsCorrelator {
    reference: Vec<(i64, i64)>,
    shift: u32,
    window: VecDeque<(i64, i64)>,
}

impl LtsCorrelator {
    /// Correlates against `reference`.
    pub fn new(reference: Vec<(i64, i64)>, shift: u32) -> Self {
        Self {
            window: VecDeque::with_capacity(reference.len()),
            reference,
            shift,
        }
    }
}

/// Multiply-accumulate of `window` against `conj(reference)`, both
/// components arithmetically shifted right by `shift`.
pub(crate) fn conj_mac<'a>(
    window: impl IntoIterator<Item = &'a (i64, i64)>,
    reference: &[(i64, i64)],
    shift: u32,
) -> (i64, i64) {
    let (re, im) = window
        .into_iter()
        .zip(reference)
        .fold((0i128, 0i128), |(re, im), (&(a, b), &(c, d))| {
            let (a, b, c, d) = (
                i128::from(a),
                i128::from(b),
                i128::from(c),
                i128::from(d),
            );
            (re + a * c + b * d, im + b * c - a * d)
        });
    ((re >> shift) as i64, (im >> shift) as i64)
}

impl StreamKernel for LtsCorrelator {
    fn name(&self) -> &str {
        "lts_correlator"
    }

    fn input(&self) -> StreamInterface {
        packed_iq("s_axis")
    }

    fn output(&self) -> StreamInterface {
        split_complex("m_axis", 32)
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn process(
        &mut self,
        fields: &[i64],
        _last: bool,
        out: &mut Vec<OutputBeat>,
    ) -> Result<(), SimError> {
        if self.reference.is_empty() {
            return Ok(());
        }
        self.window.push_back(complex_fields(fields));
        if self.window.len() > self.reference.len() {
            self.window.pop_front();
        }
        if self.window.len() == self.reference.len() {
            let (re, im) = conj_mac(&self.window, &self.reference, self.shift);
            out.push(OutputBeat::new(vec![re, im]));
        }
        Ok(())
    }
}
