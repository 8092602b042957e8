//! Least-squares channel estimator.

use wavesense_bfm::StreamInterface;
use wavesense_golden::equalizer::{is_active_bin, FFT_SIZE};
use wavesense_golden::synth::lts_bins;
use wavesense_sim::SimError;

use super::{complex_fields, split_complex, OutputBeat, StreamKernel};

/// Averages the transforms of two long training symbols and multiplies by
/// the known training values, emitting one estimate per active bin.
///
/// Inputs arrive as consecutive 64-bin symbols; every second symbol completes
/// a pair and produces 52 beats, `last` on the final one.
#[derive(Debug, Clone)]
pub struct ChannelEstimator {
    training: [i64; FFT_SIZE],
    first: Vec<(i64, i64)>,
    second: Vec<(i64, i64)>,
}

impl ChannelEstimator {
    /// An estimator for the legacy long training sequence.
    pub fn new() -> Self {
        Self {
            training: lts_bins().map(|v| v as i64),
            first: Vec::with_capacity(FFT_SIZE),
            second: Vec::with_capacity(FFT_SIZE),
        }
    }
}

impl Default for ChannelEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamKernel for ChannelEstimator {
    fn name(&self) -> &str {
        "channel_estimator"
    }

    fn input(&self) -> StreamInterface {
        split_complex("fft", 16).with_last()
    }

    fn output(&self) -> StreamInterface {
        split_complex("csi", 16).with_last()
    }

    fn reset(&mut self) {
        self.first.clear();
        self.second.clear();
    }

    fn process(
        &mut self,
        fields: &[i64],
        _last: bool,
        out: &mut Vec<OutputBeat>,
    ) -> Result<(), SimError> {
        let bin = complex_fields(fields);
        if self.first.len() < FFT_SIZE {
            self.first.push(bin);
            return Ok(());
        }
        self.second.push(bin);
        if self.second.len() < FFT_SIZE {
            return Ok(());
        }
        let start = out.len();
        for k in (0..FFT_SIZE).filter(|&k| is_active_bin(k)) {
            let (r1, i1) = self.first[k];
            let (r2, i2) = self.second[k];
            let l = self.training[k];
            out.push(OutputBeat::new(vec![((r1 + r2) * l) >> 1, ((i1 + i2) * l) >> 1]));
        }
        if let Some(end) = out[start..].last_mut() {
            end.last = true;
        }
        self.first.clear();
        self.second.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavesense_golden::equalizer::ACTIVE_BINS;

    #[test]
    fn flat_channel_pair() {
        let l = lts_bins();
        let mut est = ChannelEstimator::new();
        let mut out = Vec::new();
        for _ in 0..2 {
            for &v in &l {
                est.process(&[(v * 1000.0) as i64, 0], false, &mut out).unwrap();
            }
        }
        assert_eq!(out.len(), ACTIVE_BINS);
        assert!(out.iter().all(|b| b.fields == vec![1000, 0]));
        assert!(out[ACTIVE_BINS - 1].last);
        assert!(!out[0].last);
    }

    #[test]
    fn waits_for_the_second_symbol() {
        let mut est = ChannelEstimator::new();
        let mut out = Vec::new();
        for _ in 0..127 {
            est.process(&[1, 1], false, &mut out).unwrap();
        }
        assert!(out.is_empty());
        est.reset();
        for _ in 0..128 {
            est.process(&[0, 0], false, &mut out).unwrap();
        }
        assert_eq!(out.len(), ACTIVE_BINS);
    }
}
