//! Cooperative clock-edge simulation for the wavesense harness.
//!
//! This crate hosts the device under test and the harness tasks that drive
//! and observe it. There are no threads: a single [`SimKernel`] advances one
//! reference clock half a cycle at a time and resumes `async` tasks that wait
//! on clock edges, settle points, or signal changes.
//!
//! # Usage
//!
//! ```ignore
//! use wavesense_sim::{SimConfig, SimKernel};
//!
//! let mut kernel = SimKernel::new(Box::new(my_dut), &SimConfig::default())?;
//! let sim = kernel.handle();
//! let valid = sim.signal("s_axis_tvalid")?;
//! kernel.spawn("driver", async move {
//!     sim.falling_edge().await;
//!     sim.write_bool(valid, true)
//! });
//! kernel.run_cycles(10)?;
//! ```
//!
//! # Modules
//!
//! - `error`: simulation error types
//! - `time`: femtosecond timestamps and the reference clock
//! - `signal`: the signal bank and single-writer ownership
//! - `dut`: the device-under-test trait and its port accessor
//! - `kernel`: the task scheduler and trigger futures
//! - `waveform`: VCD output

#![warn(missing_docs)]

pub mod dut;
pub mod error;
pub mod kernel;
pub mod signal;
pub mod time;
pub mod waveform;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub use dut::{Direction, Dut, DutIo, Port};
pub use error::SimError;
pub use kernel::{
    JoinHandle, Phase, SimHandle, SimKernel, TaskId, TaskResult, Trigger, TriggerFuture,
};
pub use signal::{SignalBank, SignalId, SignalState, Writer};
pub use time::{Clock, Edge, SimTime, FS_PER_NS, FS_PER_PS, FS_PER_US};
pub use waveform::{VcdRecorder, WaveformRecorder};

/// Kernel construction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Reference clock period in femtoseconds.
    pub clock_period_fs: u64,
    /// Name of the reference clock signal.
    pub clock_name: String,
    /// Maximum settle iterations per half-cycle before reporting a loop.
    pub max_deltas: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            clock_period_fs: 10 * FS_PER_NS,
            clock_name: "clk".to_string(),
            max_deltas: 1000,
        }
    }
}

/// Creates a buffered VCD recorder writing to `path`.
pub fn open_vcd(path: &Path) -> Result<Box<dyn WaveformRecorder>, SimError> {
    let file = File::create(path)?;
    Ok(Box::new(VcdRecorder::new(BufWriter::new(file))))
}
