//! Decimating FIR filter.

use std::collections::VecDeque;

use wavesense_bfm::StreamInterface;
use wavesense_sim::SimError;

use super::{OutputBeat, StreamKernel};

/// Integer FIR filter followed by a phase-accumulator decimator.
///
/// The tap line starts at zero after reset. Each sample `x[n]` computes the
/// full-rate output `Σ h[j]·x[n-j]`, rounded back by `frac_bits`, which
/// leaves the pipeline `T` samples later. The accumulator keeps a leaving
/// output whenever `f_out` steps carry past `f_in`. Callers flush a burst by
/// appending `T` zero samples.
#[derive(Debug, Clone)]
pub struct FirDecimator {
    taps: Vec<i64>,
    frac_bits: u32,
    f_in: u64,
    f_out: u64,
    line: VecDeque<i64>,
    pipeline: VecDeque<i64>,
    phase: u64,
}

impl FirDecimator {
    /// A filter with `taps` in Q`frac_bits`, converting `f_in` to `f_out`.
    pub fn new(taps: Vec<i64>, frac_bits: u32, f_in: u64, f_out: u64) -> Self {
        Self {
            line: vec![0; taps.len()].into(),
            pipeline: VecDeque::with_capacity(taps.len() + 1),
            taps,
            frac_bits,
            f_in: f_in.max(1),
            f_out,
            phase: 0,
        }
    }

    fn filter(&self) -> i64 {
        // line.back() is the newest sample and pairs with h[0].
        let acc: i64 = self
            .taps
            .iter()
            .zip(self.line.iter().rev())
            .map(|(h, x)| h * x)
            .sum();
        match self.frac_bits {
            0 => acc,
            bits => (acc + (1 << (bits - 1))) >> bits,
        }
    }
}

impl StreamKernel for FirDecimator {
    fn name(&self) -> &str {
        "fir_decimator"
    }

    fn input(&self) -> StreamInterface {
        StreamInterface::axis("s_axis_data").lane("data", "s_axis_data_tdata", 16, true)
    }

    fn output(&self) -> StreamInterface {
        StreamInterface::axis("m_axis_data").lane("data", "m_axis_data_tdata", 16, true)
    }

    fn reset(&mut self) {
        self.line.iter_mut().for_each(|x| *x = 0);
        self.pipeline.clear();
        self.phase = 0;
    }

    fn process(
        &mut self,
        fields: &[i64],
        _last: bool,
        out: &mut Vec<OutputBeat>,
    ) -> Result<(), SimError> {
        self.line.push_back(fields.first().copied().unwrap_or(0));
        if self.line.len() > self.taps.len() {
            self.line.pop_front();
        }
        let full = self.filter();
        self.pipeline.push_back(full);
        if self.pipeline.len() <= self.taps.len() {
            return Ok(());
        }
        let Some(y) = self.pipeline.pop_front() else {
            return Ok(());
        };
        self.phase += self.f_out;
        if self.phase >= self.f_in {
            self.phase -= self.f_in;
            out.push(OutputBeat::new(vec![y]));
        }
        Ok(())
    }
}
