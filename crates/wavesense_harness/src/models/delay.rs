//! Fixed-depth delay line.

use std::collections::VecDeque;

use wavesense_bfm::StreamInterface;
use wavesense_sim::SimError;

use super::{OutputBeat, StreamKernel};

/// Holds back the most recent `depth` samples. A sample leaves the line only
/// when a newer one pushes it out, so `n` inputs produce `n - depth` outputs
/// and the last `depth` inputs stay inside until reset.
#[derive(Debug, Clone)]
pub struct DelayLine {
    depth: usize,
    line: VecDeque<i64>,
}

impl DelayLine {
    /// A delay line `depth` samples long.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            line: VecDeque::with_capacity(depth + 1),
        }
    }
}

impl StreamKernel for DelayLine {
    fn name(&self) -> &str {
        "delay_line"
    }

    fn input(&self) -> StreamInterface {
        StreamInterface::axis("s00_axis").lane("data", "s00_axis_tdata", 32, true)
    }

    fn output(&self) -> StreamInterface {
        StreamInterface::axis("m00_axis").lane("data", "m00_axis_tdata", 32, true)
    }

    fn reset(&mut self) {
        self.line.clear();
    }

    fn process(
        &mut self,
        fields: &[i64],
        _last: bool,
        out: &mut Vec<OutputBeat>,
    ) -> Result<(), SimError> {
        self.line.push_back(fields.first().copied().unwrap_or(0));
        if self.line.len() > self.depth {
            if let Some(oldest) = self.line.pop_front() {
                out.push(OutputBeat::new(vec![oldest]));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_after_depth_samples() {
        let mut line = DelayLine::new(3);
        let mut out = Vec::new();
        for x in 10..16 {
            line.process(&[x], false, &mut out).unwrap();
        }
        let values: Vec<i64> = out.iter().map(|b| b.fields[0]).collect();
        assert_eq!(values, vec![10, 11, 12]);
    }

    #[test]
    fn reset_empties_the_line() {
        let mut line = DelayLine::new(2);
        let mut out = Vec::new();
        line.process(&[1], false, &mut out).unwrap();
        line.process(&[2], false, &mut out).unwrap();
        line.reset();
        line.process(&[3], false, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
