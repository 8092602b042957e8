//! Complex magnitude squared.

use wavesense_bfm::StreamInterface;
use wavesense_sim::SimError;

use super::{complex_fields, OutputBeat, StreamKernel};

/// `i² + q²` per sample on valid-only streams: the input is never stalled and
/// each result is presented for exactly one cycle.
#[derive(Debug, Clone, Default)]
pub struct MagSquared;

impl StreamKernel for MagSquared {
    fn name(&self) -> &str {
        "complex_to_mag_sq"
    }

    fn input(&self) -> StreamInterface {
        StreamInterface::valid_only("iq", "iq_valid_in")
            .lane("i", "i_in", 16, true)
            .lane("q", "q_in", 16, true)
    }

    fn output(&self) -> StreamInterface {
        StreamInterface::valid_only("mag_sq", "mag_sq_valid_out")
            .lane("mag_sq", "mag_sq_out", 32, false)
    }

    fn reset(&mut self) {}

    fn process(
        &mut self,
        fields: &[i64],
        _last: bool,
        out: &mut Vec<OutputBeat>,
    ) -> Result<(), SimError> {
        let (i, q) = complex_fields(fields);
        out.push(OutputBeat::new(vec![i * i + q * q]));
        Ok(())
    }
}
