//! Waveform recording.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! writes IEEE 1364 Value Change Dump text that GTKWave or Surfer can open,
//! which is the quickest way to see why a handshake stalled.

use std::collections::HashMap;
use std::io::Write;

use wavesense_common::FixedInt;

use crate::error::SimError;
use crate::signal::SignalId;

/// Sink for signal value changes.
pub trait WaveformRecorder {
    /// Declares a signal inside the current scope.
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a scope.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a new value at `time_fs`. Times must be non-decreasing.
    fn record_change(
        &mut self,
        time_fs: u64,
        id: SignalId,
        value: FixedInt,
    ) -> Result<(), SimError>;

    /// Flushes buffered output.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// Value Change Dump writer with a 1 fs timescale.
pub struct VcdRecorder<W: Write> {
    writer: W,
    codes: HashMap<SignalId, (String, u32)>,
    header_written: bool,
    definitions_closed: bool,
    last_time: Option<u64>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            codes: HashMap::new(),
            header_written: false,
            definitions_closed: false,
            last_time: None,
        }
    }

    /// Consumes the recorder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ensure_header(&mut self) -> Result<(), SimError> {
        if !self.header_written {
            writeln!(self.writer, "$version wavesense $end")?;
            writeln!(self.writer, "$timescale 1fs $end")?;
            self.header_written = true;
        }
        Ok(())
    }

    fn close_definitions(&mut self) -> Result<(), SimError> {
        self.ensure_header()?;
        if !self.definitions_closed {
            writeln!(self.writer, "$enddefinitions $end")?;
            self.definitions_closed = true;
        }
        Ok(())
    }

    /// Short printable identifier for the `index`-th signal, base 94 from `!`.
    fn id_code(mut index: usize) -> String {
        let mut code = String::new();
        loop {
            code.push(char::from(b'!' + (index % 94) as u8));
            index /= 94;
            if index == 0 {
                return code;
            }
            index -= 1;
        }
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError> {
        self.ensure_header()?;
        let code = Self::id_code(self.codes.len());
        writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
        self.codes.insert(id, (code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.ensure_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(
        &mut self,
        time_fs: u64,
        id: SignalId,
        value: FixedInt,
    ) -> Result<(), SimError> {
        self.close_definitions()?;
        if self.last_time != Some(time_fs) {
            writeln!(self.writer, "#{time_fs}")?;
            self.last_time = Some(time_fs);
        }
        let Some((code, width)) = self.codes.get(&id) else {
            return Err(SimError::UnknownSignal {
                name: format!("#{} (not registered with the VCD recorder)", id.as_raw()),
            });
        };
        if *width == 1 {
            writeln!(self.writer, "{}{code}", u8::from(value.is_high()))?;
        } else {
            writeln!(self.writer, "b{:b} {code}", value.as_unsigned())?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        self.close_definitions()?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(rec: VcdRecorder<Vec<u8>>) -> String {
        String::from_utf8(rec.into_inner()).unwrap()
    }

    #[test]
    fn id_codes() {
        assert_eq!(VcdRecorder::<Vec<u8>>::id_code(0), "!");
        assert_eq!(VcdRecorder::<Vec<u8>>::id_code(93), "~");
        assert_eq!(VcdRecorder::<Vec<u8>>::id_code(94), "!!");
        assert_eq!(VcdRecorder::<Vec<u8>>::id_code(95), "\"!");
    }

    #[test]
    fn header_and_vars() {
        let mut rec = VcdRecorder::new(Vec::new());
        rec.begin_scope("fifo").unwrap();
        rec.register_signal(SignalId::from_raw(0), "clk", 1).unwrap();
        rec.register_signal(SignalId::from_raw(1), "data", 16).unwrap();
        rec.end_scope().unwrap();
        rec.finalize().unwrap();
        let text = output(rec);
        assert!(text.starts_with("$version wavesense $end\n$timescale 1fs $end\n"));
        assert!(text.contains("$scope module fifo $end"));
        assert!(text.contains("$var wire 1 ! clk $end"));
        assert!(text.contains("$var wire 16 \" data $end"));
        assert!(text.ends_with("$upscope $end\n$enddefinitions $end\n"));
    }

    #[test]
    fn changes_grouped_by_time() {
        let mut rec = VcdRecorder::new(Vec::new());
        rec.begin_scope("top").unwrap();
        rec.register_signal(SignalId::from_raw(0), "clk", 1).unwrap();
        rec.register_signal(SignalId::from_raw(1), "data", 8).unwrap();
        rec.end_scope().unwrap();
        rec.record_change(0, SignalId::from_raw(0), FixedInt::from_bool(false))
            .unwrap();
        rec.record_change(0, SignalId::from_raw(1), FixedInt::zero(8))
            .unwrap();
        rec.record_change(5000, SignalId::from_raw(0), FixedInt::from_bool(true))
            .unwrap();
        rec.record_change(5000, SignalId::from_raw(1), FixedInt::wrapping_from_signed(-2, 8))
            .unwrap();
        rec.finalize().unwrap();
        let text = output(rec);
        let body = text.split("$enddefinitions $end\n").nth(1).unwrap();
        assert_eq!(body, "#0\n0!\nb0 \"\n#5000\n1!\nb11111110 \"\n");
    }

    #[test]
    fn unregistered_signal_is_an_error() {
        let mut rec = VcdRecorder::new(Vec::new());
        let err = rec
            .record_change(0, SignalId::from_raw(9), FixedInt::zero(1))
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownSignal { .. }));
    }
}
