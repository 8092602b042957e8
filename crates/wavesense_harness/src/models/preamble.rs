//! Short training field detector.

use std::collections::VecDeque;

use wavesense_bfm::StreamInterface;
use wavesense_common::FieldSpec;
use wavesense_sim::SimError;

use super::{complex_fields, OutputBeat, StreamKernel};

/// Integer delay-and-correlate detector.
///
/// Keeps the last `window + lag` samples and evaluates
/// `|Σ s[j]·conj(s[j+lag])| >= 0.75 · Σ |s[j]|²` over the oldest `window` of
/// them, squared to stay in integers. After `min_plateau` consecutive hits it
/// reports the start of the window that completed the plateau, then stays
/// quiet until the metric drops.
#[derive(Debug, Clone)]
pub struct ShortPreambleDetector {
    window: usize,
    lag: usize,
    min_plateau: usize,
    samples: VecDeque<(i64, i64)>,
    count: u64,
    run: usize,
}

impl ShortPreambleDetector {
    /// A detector with window `window`, repetition period `lag` and plateau
    /// length `min_plateau`.
    pub fn new(window: usize, lag: usize, min_plateau: usize) -> Self {
        Self {
            window: window.max(1),
            lag,
            min_plateau: min_plateau.max(1),
            samples: VecDeque::with_capacity(window + lag),
            count: 0,
            run: 0,
        }
    }

    fn span(&self) -> usize {
        self.window + self.lag
    }

    fn correlated(&self) -> bool {
        let (mut re, mut im, mut power) = (0i128, 0i128, 0i128);
        for j in 0..self.window {
            let (a, b) = self.samples[j];
            let (c, d) = self.samples[j + self.lag];
            let (a, b, c, d) = (i128::from(a), i128::from(b), i128::from(c), i128::from(d));
            re += a * c + b * d;
            im += b * c - a * d;
            power += a * a + b * b;
        }
        power > 0 && 16 * (re * re + im * im) >= 9 * power * power
    }
}

impl Default for ShortPreambleDetector {
    fn default() -> Self {
        Self::new(48, 16, 16)
    }
}

impl StreamKernel for ShortPreambleDetector {
    fn name(&self) -> &str {
        "short_preamble_detector"
    }

    fn input(&self) -> StreamInterface {
        StreamInterface::valid_only("sample_in", "sample_in_valid")
            .packed_lane("i", "sample_in", FieldSpec::signed(16, 16))
            .packed_lane("q", "sample_in", FieldSpec::signed(16, 0))
    }

    fn output(&self) -> StreamInterface {
        StreamInterface::valid_only("detector", "short_preamble_detected").lane(
            "position",
            "preamble_position",
            32,
            false,
        )
    }

    fn reset(&mut self) {
        self.samples.clear();
        self.count = 0;
        self.run = 0;
    }

    fn process(
        &mut self,
        fields: &[i64],
        _last: bool,
        out: &mut Vec<OutputBeat>,
    ) -> Result<(), SimError> {
        self.samples.push_back(complex_fields(fields));
        self.count += 1;
        if self.samples.len() > self.span() {
            self.samples.pop_front();
        }
        if self.samples.len() < self.span() {
            return Ok(());
        }
        if !self.correlated() {
            self.run = 0;
            return Ok(());
        }
        self.run += 1;
        if self.run == self.min_plateau {
            let start = self.count - self.span() as u64;
            out.push(OutputBeat::new(vec![start as i64]));
        }
        Ok(())
    }
}
