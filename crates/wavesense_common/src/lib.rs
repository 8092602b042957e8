//! Foundational types shared across the wavesense verification harness.
//!
//! This crate provides the typed fixed-width integer used for every signal
//! value, the bit-field codec that maps lanes onto streaming words, frequency
//! values for clocks and sample rates, and the interleaved I/Q capture reader
//! that supplies static stimulus.

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod fixed;
pub mod frequency;
pub mod samples;

pub use codec::{decode, encode, pack_iq, unpack_iq, FieldSpec, Overflow};
pub use error::CodecError;
pub use fixed::{signed_range, FixedInt, MAX_WIDTH};
pub use frequency::{Frequency, ParseFrequencyError};
pub use samples::{IqSample, SampleError, SampleFile};
