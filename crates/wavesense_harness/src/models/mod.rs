//! Behavioral device models.
//!
//! Each model is a [`StreamKernel`] describing what one pipeline block does
//! to the values of accepted beats. [`StreamStage`] wraps a kernel into a
//! [`Dut`] with the cycle behavior every block shares:
//!
//! - synchronous active-high reset on `rst`
//! - input `ready` registered on the rising edge from the output queue depth
//! - one output beat presented per cycle, held until `ready` (or for a single
//!   cycle on streams without `ready`)
//!
//! Port names and widths come from the kernel's [`StreamInterface`]s, so the
//! harness drives and observes a model with exactly the interfaces it
//! declares.

mod channel;
mod delay;
mod fft;
mod fifo;
mod fir;
mod mag;
mod preamble;
mod sync_long;
mod xcorr;

use std::collections::VecDeque;

use wavesense_bfm::StreamInterface;
use wavesense_common::{FieldSpec, Overflow};
use wavesense_sim::{Dut, DutIo, Port, SimError};

pub use channel::ChannelEstimator;
pub use delay::DelayLine;
pub use fft::BlockFft;
pub use fifo::StreamFifo;
pub use fir::FirDecimator;
pub use mag::MagSquared;
pub use preamble::ShortPreambleDetector;
pub use sync_long::LongPreambleSync;
pub use xcorr::LtsCorrelator;

/// Name of the reset input shared by every model.
pub const RESET: &str = "rst";

/// One beat produced by a kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBeat {
    /// Field values in output lane order.
    pub fields: Vec<i64>,
    /// End-of-frame marker.
    pub last: bool,
}

impl OutputBeat {
    /// A beat that does not end a frame.
    pub fn new(fields: Vec<i64>) -> Self {
        Self { fields, last: false }
    }
}

/// Value-level behavior of a streaming block.
pub trait StreamKernel {
    /// Instance name.
    fn name(&self) -> &str;

    /// The consumed stream.
    fn input(&self) -> StreamInterface;

    /// The produced stream.
    fn output(&self) -> StreamInterface;

    /// Returns to the power-on state.
    fn reset(&mut self);

    /// Handles one accepted input beat, appending any beats it produces.
    fn process(
        &mut self,
        fields: &[i64],
        last: bool,
        out: &mut Vec<OutputBeat>,
    ) -> Result<(), SimError>;
}

/// A [`StreamKernel`] with handshake, queueing, and reset.
pub struct StreamStage<K> {
    kernel: K,
    input: StreamInterface,
    output: StreamInterface,
    pending: VecDeque<OutputBeat>,
    capacity: usize,
}

impl<K: StreamKernel> StreamStage<K> {
    /// Wraps `kernel` with a four-entry output queue.
    pub fn new(kernel: K) -> Self {
        Self::with_capacity(kernel, 4)
    }

    /// Wraps `kernel`; input `ready` drops once `capacity` beats are queued.
    pub fn with_capacity(kernel: K, capacity: usize) -> Self {
        let input = kernel.input();
        let output = kernel.output();
        Self {
            kernel,
            input,
            output,
            pending: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn fault(&self, reason: String) -> SimError {
        SimError::Dut {
            dut: self.kernel.name().to_string(),
            reason,
        }
    }

    fn read_beat(&self, io: &DutIo<'_>) -> Result<(Vec<i64>, bool), SimError> {
        let fields = self
            .input
            .lanes
            .iter()
            .map(|lane| -> Result<i64, SimError> {
                Ok(lane.field.decode(io.read_unsigned(&lane.signal)?)?)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let last = match &self.input.last {
            Some(name) => io.read_bool(name)?,
            None => false,
        };
        Ok((fields, last))
    }

    fn present(&self, io: &mut DutIo<'_>) -> Result<(), SimError> {
        let Some(beat) = self.pending.front() else {
            io.write_bool(&self.output.valid, false)?;
            if let Some(last) = &self.output.last {
                io.write_bool(last, false)?;
            }
            return Ok(());
        };
        if beat.fields.len() != self.output.lanes.len() {
            return Err(self.fault(format!(
                "produced {} fields for {} output lanes",
                beat.fields.len(),
                self.output.lanes.len()
            )));
        }
        let mut words: Vec<(&str, u64)> = Vec::new();
        for (lane, &value) in self.output.lanes.iter().zip(&beat.fields) {
            let index = match words.iter().position(|(s, _)| *s == lane.signal) {
                Some(index) => index,
                None => {
                    words.push((lane.signal.as_str(), 0));
                    words.len() - 1
                }
            };
            words[index].1 = lane.field.insert(words[index].1, value, Overflow::Wrap)?;
        }
        for (signal, word) in words {
            io.write_unsigned(signal, word)?;
        }
        if let Some(last) = &self.output.last {
            io.write_bool(last, beat.last)?;
        }
        io.write_bool(&self.output.valid, true)
    }
}

impl<K: StreamKernel> Dut for StreamStage<K> {
    fn name(&self) -> &str {
        self.kernel.name()
    }

    fn ports(&self) -> Vec<Port> {
        let mut ports = vec![Port::input(RESET, 1)];
        stream_ports(&self.input, true, &mut ports);
        stream_ports(&self.output, false, &mut ports);
        ports
    }

    fn on_rising_edge(&mut self, io: &mut DutIo<'_>) -> Result<(), SimError> {
        if io.read_bool(RESET)? {
            self.kernel.reset();
            self.pending.clear();
            if let Some(ready) = &self.input.ready {
                io.write_bool(ready, false)?;
            }
            return self.present(io);
        }

        let accept = io.read_bool(&self.input.valid)?
            && match &self.input.ready {
                Some(ready) => io.read_bool(ready)?,
                None => true,
            };
        let emit = io.read_bool(&self.output.valid)?
            && match &self.output.ready {
                Some(ready) => io.read_bool(ready)?,
                None => true,
            };

        if emit {
            self.pending.pop_front();
        }
        if accept {
            let (fields, last) = self.read_beat(io)?;
            let mut produced = Vec::new();
            self.kernel.process(&fields, last, &mut produced)?;
            self.pending.extend(produced);
        }
        self.present(io)?;
        if let Some(ready) = &self.input.ready {
            io.write_bool(ready, self.pending.len() < self.capacity)?;
        }
        Ok(())
    }
}

/// Declares the handshake and data signals of `iface`. Data flows into the
/// model when `sink` is set, so `valid`, `last` and data are inputs and
/// `ready` is an output.
fn stream_ports(iface: &StreamInterface, sink: bool, ports: &mut Vec<Port>) {
    let forward = |name: &str, width: u32| {
        if sink {
            Port::input(name, width)
        } else {
            Port::output(name, width)
        }
    };
    ports.push(forward(&iface.valid, 1));
    if let Some(ready) = &iface.ready {
        ports.push(if sink {
            Port::output(ready, 1)
        } else {
            Port::input(ready, 1)
        });
    }
    if let Some(last) = &iface.last {
        ports.push(forward(last, 1));
    }
    let mut words: Vec<(&str, u32)> = Vec::new();
    for lane in &iface.lanes {
        let span = lane.field.offset + lane.field.width;
        match words.iter_mut().find(|(s, _)| *s == lane.signal) {
            Some(word) => word.1 = word.1.max(span),
            None => words.push((lane.signal.as_str(), span)),
        }
    }
    ports.extend(words.into_iter().map(|(name, width)| forward(name, width)));
}

/// AXI-Stream interface carrying one complex sample per 32-bit word, real
/// part in the high half.
pub fn packed_iq(prefix: &str) -> StreamInterface {
    let data = format!("{prefix}_tdata");
    StreamInterface::axis(prefix)
        .packed_lane("i", &data, FieldSpec::signed(16, 16))
        .packed_lane("q", &data, FieldSpec::signed(16, 0))
}

/// AXI-Stream interface with separate real and imaginary data signals.
pub fn split_complex(prefix: &str, width: u32) -> StreamInterface {
    StreamInterface::axis(prefix)
        .lane("re", &format!("{prefix}_re_tdata"), width, true)
        .lane("im", &format!("{prefix}_im_tdata"), width, true)
}

/// `(i, q)` of a beat from an interface built by [`packed_iq`] or
/// [`split_complex`].
pub(crate) fn complex_fields(fields: &[i64]) -> (i64, i64) {
    (
        fields.first().copied().unwrap_or(0),
        fields.get(1).copied().unwrap_or(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavesense_sim::Direction;

    #[test]
    fn stage_ports_follow_interfaces() {
        let stage = StreamStage::new(StreamFifo::new(8));
        let ports = stage.ports();
        let find = |name: &str| ports.iter().find(|p| p.name == name).cloned().unwrap();
        assert_eq!(find(RESET).direction, Direction::Input);
        assert_eq!(find("s_axis_tvalid").direction, Direction::Input);
        assert_eq!(find("s_axis_tready").direction, Direction::Output);
        assert_eq!(find("s_axis_tdata").width, 32);
        assert_eq!(find("m_axis_tvalid").direction, Direction::Output);
        assert_eq!(find("m_axis_tready").direction, Direction::Input);
        assert_eq!(find("m_axis_tlast").direction, Direction::Output);
        assert_eq!(ports.len(), 9);
    }

    #[test]
    fn split_lanes_get_their_own_signals() {
        let mut ports = Vec::new();
        stream_ports(&split_complex("csi", 16), false, &mut ports);
        let names: Vec<&str> = ports.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["csi_tvalid", "csi_tready", "csi_re_tdata", "csi_im_tdata"]);
        assert!(ports[2..].iter().all(|p| p.width == 16));
    }

    #[test]
    fn complex_fields_default_to_zero() {
        assert_eq!(complex_fields(&[3, -4]), (3, -4));
        assert_eq!(complex_fields(&[7]), (7, 0));
    }
}
