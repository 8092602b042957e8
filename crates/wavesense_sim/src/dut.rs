//! The device-under-test boundary.
//!
//! The kernel treats the DUT as an opaque clocked block: it declares its ports
//! once, updates its registers on every rising edge, and optionally recomputes
//! combinational outputs while the kernel settles. All access goes through
//! [`DutIo`], which resolves ports by name and writes with DUT ownership.

use wavesense_common::FixedInt;

use crate::error::SimError;
use crate::signal::{SignalBank, Writer};

/// Direction of a port as seen from the DUT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Driven by the harness.
    Input,
    /// Driven by the DUT.
    Output,
}

/// A declared DUT port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Port {
    /// Signal name.
    pub name: String,
    /// Width in bits.
    pub width: u32,
    /// Direction relative to the DUT.
    pub direction: Direction,
}

impl Port {
    /// An input port.
    pub fn input(name: &str, width: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            direction: Direction::Input,
        }
    }

    /// An output port.
    pub fn output(name: &str, width: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            direction: Direction::Output,
        }
    }
}

/// A clocked device driven by the kernel.
///
/// The reference clock is owned by the kernel and must not appear in
/// [`ports`](Dut::ports).
pub trait Dut {
    /// Instance name used in logs and waveforms.
    fn name(&self) -> &str;

    /// Ports to declare in the signal bank.
    fn ports(&self) -> Vec<Port>;

    /// Samples inputs and updates registered outputs at a rising edge.
    ///
    /// Inputs hold the values they had just before the edge, since harness
    /// tasks resumed by the edge run afterwards.
    fn on_rising_edge(&mut self, io: &mut DutIo<'_>) -> Result<(), SimError>;

    /// Recomputes combinational outputs. Called repeatedly until no signal
    /// changes.
    fn settle(&mut self, io: &mut DutIo<'_>) -> Result<(), SimError> {
        let _ = io;
        Ok(())
    }
}

/// Port access handed to a [`Dut`] by the kernel.
pub struct DutIo<'a> {
    bank: &'a mut SignalBank,
}

impl<'a> DutIo<'a> {
    pub(crate) fn new(bank: &'a mut SignalBank) -> Self {
        Self { bank }
    }

    /// Reads a port.
    pub fn read(&self, port: &str) -> Result<FixedInt, SimError> {
        let id = self.bank.lookup(port)?;
        Ok(self.bank.value(id))
    }

    /// Reads a port as a boolean (any bit set).
    pub fn read_bool(&self, port: &str) -> Result<bool, SimError> {
        Ok(self.read(port)?.is_high())
    }

    /// Reads a port as a two's-complement integer.
    pub fn read_signed(&self, port: &str) -> Result<i64, SimError> {
        Ok(self.read(port)?.as_signed())
    }

    /// Reads a port as an unsigned integer.
    pub fn read_unsigned(&self, port: &str) -> Result<u64, SimError> {
        Ok(self.read(port)?.as_unsigned())
    }

    /// Writes an output port.
    pub fn write(&mut self, port: &str, value: FixedInt) -> Result<(), SimError> {
        let id = self.bank.lookup(port)?;
        self.bank.drive(id, value, Writer::Dut)
    }

    /// Writes a 1-bit output port.
    pub fn write_bool(&mut self, port: &str, value: bool) -> Result<(), SimError> {
        self.write(port, FixedInt::from_bool(value))
    }

    /// Writes an output port, wrapping `value` to the port width.
    pub fn write_signed(&mut self, port: &str, value: i64) -> Result<(), SimError> {
        let id = self.bank.lookup(port)?;
        let width = self.bank.get(id).width;
        self.bank
            .drive(id, FixedInt::wrapping_from_signed(value, width), Writer::Dut)
    }

    /// Writes an output port, masking `value` to the port width.
    pub fn write_unsigned(&mut self, port: &str, value: u64) -> Result<(), SimError> {
        let id = self.bank.lookup(port)?;
        let width = self.bank.get(id).width;
        self.bank
            .drive(id, FixedInt::wrapping_from_unsigned(value, width), Writer::Dut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> SignalBank {
        let mut bank = SignalBank::new();
        bank.declare("in", 8, None).unwrap();
        bank.declare("out", 8, Some(Writer::Dut)).unwrap();
        bank
    }

    #[test]
    fn port_constructors() {
        let p = Port::input("s_axis_tvalid", 1);
        assert_eq!(p.direction, Direction::Input);
        assert_eq!(Port::output("m_axis_tdata", 32).width, 32);
    }

    #[test]
    fn write_signed_wraps_to_width() {
        let mut bank = bank();
        let mut io = DutIo::new(&mut bank);
        io.write_signed("out", -1).unwrap();
        assert_eq!(io.read_unsigned("out").unwrap(), 0xFF);
        assert_eq!(io.read_signed("out").unwrap(), -1);
        io.write_unsigned("out", 0x1_02).unwrap();
        assert_eq!(io.read_unsigned("out").unwrap(), 2);
    }

    #[test]
    fn dut_cannot_drive_inputs_owned_by_tasks() {
        let mut bank = bank();
        let id = bank.lookup("in").unwrap();
        let task = Writer::Task(crate::kernel::TaskId::from_raw(0));
        bank.drive(id, FixedInt::zero(8), task).unwrap();
        let mut io = DutIo::new(&mut bank);
        assert!(matches!(
            io.write_signed("in", 1),
            Err(SimError::MultipleDrivers { .. })
        ));
    }

    #[test]
    fn unknown_port() {
        let mut bank = bank();
        let io = DutIo::new(&mut bank);
        assert!(matches!(
            io.read_bool("missing"),
            Err(SimError::UnknownSignal { .. })
        ));
    }
}
