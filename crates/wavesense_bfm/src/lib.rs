//! Bus-functional models for valid/ready streams.
//!
//! Everything here runs as tasks on a [`wavesense_sim::SimKernel`]:
//!
//! - [`StreamDriver`] pushes [`Descriptor`]s into a DUT input and reports a
//!   [`SimError::ProtocolStall`](wavesense_sim::SimError::ProtocolStall) when
//!   `ready` never arrives.
//! - [`StreamMonitor`] passively records completed beats and groups them into
//!   frames on `last`.
//! - [`BackpressureController`] plays a [`ReadyPolicy`] on a DUT's
//!   downstream `ready` input.
//! - [`ResetSpec`] pulses a synchronous reset.
//!
//! A beat transfers at a rising edge iff `valid` and `ready` were both high
//! when the preceding half-cycle settled.

#![warn(missing_docs)]

pub mod backpressure;
pub mod driver;
pub mod interface;
pub mod monitor;
pub mod reset;
pub mod transaction;

pub use backpressure::{BackpressureController, ReadyPolicy, ReadySchedule, ReadyWindow};
pub use driver::{BeatCounter, DriverConfig, IdleGaps, StreamDriver};
pub use interface::{BoundInterface, Lane, StreamInterface};
pub use monitor::StreamMonitor;
pub use reset::{pulse, ResetSpec};
pub use transaction::{Descriptor, Frame, FrameLog, Framing, ObservedBeat, Transaction};
