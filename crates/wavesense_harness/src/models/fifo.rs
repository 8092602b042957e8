//! Pass-through FIFO.

use wavesense_bfm::StreamInterface;
use wavesense_sim::SimError;

use super::{packed_iq, OutputBeat, StreamKernel};

/// Forwards every beat unchanged, `last` included. The queue depth is set by
/// the enclosing [`StreamStage`](super::StreamStage).
#[derive(Debug, Clone)]
pub struct StreamFifo {
    depth: usize,
}

impl StreamFifo {
    /// A FIFO that deasserts `ready` once `depth` beats are buffered.
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// Buffer depth.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl StreamKernel for StreamFifo {
    fn name(&self) -> &str {
        "stream_fifo"
    }

    fn input(&self) -> StreamInterface {
        packed_iq("s_axis").with_last()
    }

    fn output(&self) -> StreamInterface {
        packed_iq("m_axis").with_last()
    }

    fn reset(&mut self) {}

    fn process(
        &mut self,
        fields: &[i64],
        last: bool,
        out: &mut Vec<OutputBeat>,
    ) -> Result<(), SimError> {
        out.push(OutputBeat {
            fields: fields.to_vec(),
            last,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_beats_and_last() {
        let mut fifo = StreamFifo::new(8);
        let mut out = Vec::new();
        fifo.process(&[1, -2], false, &mut out).unwrap();
        fifo.process(&[3, 4], true, &mut out).unwrap();
        assert_eq!(
            out,
            vec![
                OutputBeat::new(vec![1, -2]),
                OutputBeat {
                    fields: vec![3, 4],
                    last: true
                }
            ]
        );
        assert_eq!(fifo.depth(), 8);
    }
}
