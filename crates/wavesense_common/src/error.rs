//! Error type for fixed-width values and the bit-field codec.

use thiserror::Error;

/// Errors produced when building fixed-width values or packing fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A field width outside `1..=64`.
    #[error("invalid field width {width} (expected 1..=64)")]
    InvalidWidth {
        /// The rejected width.
        width: u32,
    },

    /// A value that does not fit its declared width under the reject policy.
    #[error("value {value} does not fit in a {width}-bit {} field", signedness(.signed))]
    OutOfRange {
        /// The offending value.
        value: i128,
        /// The declared field width.
        width: u32,
        /// Whether the field was interpreted as signed.
        signed: bool,
    },

    /// The packed fields need more bits than the word provides.
    #[error("fields span {total} bits but the word holds {max}")]
    WordOverflow {
        /// Sum of all field widths (or highest occupied bit).
        total: u32,
        /// Width of the target word.
        max: u32,
    },
}

fn signedness(signed: &bool) -> &'static str {
    if *signed {
        "signed"
    } else {
        "unsigned"
    }
}
