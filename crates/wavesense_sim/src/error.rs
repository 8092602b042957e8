//! Simulation error types.
//!
//! Every fault raised while building or running a simulation is a
//! [`SimError`]. Bus-functional models reuse the same type for the protocol
//! level failures they detect ([`SimError::ProtocolStall`],
//! [`SimError::Timeout`]), so a failing task aborts the kernel run with a
//! single, typed cause.

use std::io;

use wavesense_common::CodecError;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A signal name was looked up that was never declared.
    #[error("unknown signal '{name}'")]
    UnknownSignal {
        /// The requested name.
        name: String,
    },

    /// Two declarations used the same signal name.
    #[error("signal '{name}' declared twice")]
    DuplicateSignal {
        /// The duplicated name.
        name: String,
    },

    /// A value was written with a width different from the signal's.
    #[error("width mismatch on '{signal}': signal is {expected} bits, value is {actual} bits")]
    WidthMismatch {
        /// Signal name.
        signal: String,
        /// Declared width.
        expected: u32,
        /// Width of the written value.
        actual: u32,
    },

    /// A second writer tried to drive a signal that already has an owner.
    #[error("signal '{signal}' is driven by {owner}, rejected write from {writer}")]
    MultipleDrivers {
        /// Signal name.
        signal: String,
        /// The current owner.
        owner: String,
        /// The rejected writer.
        writer: String,
    },

    /// A signal was written while the kernel was in the read-only phase.
    #[error("write to '{signal}' during the read-only phase")]
    ReadOnlyWrite {
        /// Signal name.
        signal: String,
    },

    /// Combinational settling did not converge, indicating a feedback loop.
    #[error("delta cycle limit exceeded in cycle {cycle} (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// The clock cycle in which the limit was hit.
        cycle: u64,
        /// The configured maximum.
        max_deltas: u32,
    },

    /// A driver waited longer than its budget for `ready`.
    #[error("protocol stall on '{interface}': ready not observed for {cycles} cycles")]
    ProtocolStall {
        /// Name of the stalled interface.
        interface: String,
        /// Cycles spent waiting.
        cycles: u64,
    },

    /// A bus-functional model was used inconsistently with its interface.
    #[error("protocol error on '{interface}': {reason}")]
    Protocol {
        /// Name of the interface.
        interface: String,
        /// Description of the violation.
        reason: String,
    },

    /// A bounded wait ran out of cycles.
    #[error("timed out after {cycles} cycles waiting for {waiting_for}")]
    Timeout {
        /// Description of the awaited condition.
        waiting_for: String,
        /// The exhausted budget.
        cycles: u64,
    },

    /// A device model reported an internal fault.
    #[error("DUT '{dut}': {reason}")]
    Dut {
        /// Model name.
        dut: String,
        /// Description of the fault.
        reason: String,
    },

    /// A field could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}
