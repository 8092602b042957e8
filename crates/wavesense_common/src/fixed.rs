//! Fixed-width two's-complement integers for signal values.
//!
//! A [`FixedInt`] carries its bit width alongside the raw bits, so a value read
//! from a 16-bit lane can only be turned into a Rust integer through an explicit
//! [`FixedInt::as_signed`] or [`FixedInt::as_unsigned`] call. Construction is
//! either *checked* (the value must fit) or *wrapping* (the value is masked to
//! the width, matching two's-complement wraparound in hardware).

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Widest value a [`FixedInt`] can hold.
pub const MAX_WIDTH: u32 = 64;

/// A `width`-bit integer with no implicit signedness.
///
/// The stored bits are always masked to `width`, so two values of the same
/// width compare equal exactly when their bit patterns match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixedInt {
    width: u32,
    bits: u64,
}

/// Returns a mask with the low `width` bits set.
pub(crate) fn width_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Checks that `width` is in `1..=64`.
pub fn check_width(width: u32) -> Result<(), CodecError> {
    if width == 0 || width > MAX_WIDTH {
        Err(CodecError::InvalidWidth { width })
    } else {
        Ok(())
    }
}

impl FixedInt {
    /// Creates an all-zero value of the given width.
    ///
    /// # Panics
    ///
    /// Panics if `width` is 0 or greater than 64.
    pub fn zero(width: u32) -> Self {
        Self::wrapping_from_unsigned(0, width)
    }

    /// Creates a 1-bit value from a boolean.
    pub fn from_bool(value: bool) -> Self {
        Self {
            width: 1,
            bits: u64::from(value),
        }
    }

    /// Creates a value from an unsigned integer, rejecting values that need
    /// more than `width` bits.
    pub fn from_unsigned(value: u64, width: u32) -> Result<Self, CodecError> {
        check_width(width)?;
        if value & !width_mask(width) != 0 {
            return Err(CodecError::OutOfRange {
                value: i128::from(value),
                width,
                signed: false,
            });
        }
        Ok(Self { width, bits: value })
    }

    /// Creates a value from a signed integer, rejecting values outside
    /// `-2^(width-1) ..= 2^(width-1) - 1`.
    pub fn from_signed(value: i64, width: u32) -> Result<Self, CodecError> {
        check_width(width)?;
        let (min, max) = signed_range(width);
        if value < min || value > max {
            return Err(CodecError::OutOfRange {
                value: i128::from(value),
                width,
                signed: true,
            });
        }
        Ok(Self::wrapping_from_signed(value, width))
    }

    /// Creates a value by masking `value` to `width` bits.
    ///
    /// # Panics
    ///
    /// Panics if `width` is 0 or greater than 64.
    pub fn wrapping_from_unsigned(value: u64, width: u32) -> Self {
        assert!(
            width > 0 && width <= MAX_WIDTH,
            "invalid fixed-width integer width {width}"
        );
        Self {
            width,
            bits: value & width_mask(width),
        }
    }

    /// Creates a value from the low `width` bits of `value`'s two's-complement
    /// representation.
    ///
    /// # Panics
    ///
    /// Panics if `width` is 0 or greater than 64.
    pub fn wrapping_from_signed(value: i64, width: u32) -> Self {
        Self::wrapping_from_unsigned(value as u64, width)
    }

    /// Returns the bit width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the raw bits zero-extended to 64 bits.
    pub fn as_unsigned(&self) -> u64 {
        self.bits
    }

    /// Returns the value sign-extended from its top bit.
    pub fn as_signed(&self) -> i64 {
        if self.width >= 64 {
            return self.bits as i64;
        }
        let shift = 64 - self.width;
        ((self.bits << shift) as i64) >> shift
    }

    /// Returns bit `index` (0 is the least significant bit).
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn bit(&self, index: u32) -> bool {
        assert!(
            index < self.width,
            "bit {index} out of bounds for width {}",
            self.width
        );
        (self.bits >> index) & 1 == 1
    }

    /// Returns `true` if any bit is set.
    pub fn is_high(&self) -> bool {
        self.bits != 0
    }

    /// Returns the same bits reinterpreted at a new width, masking or
    /// zero-extending as needed.
    pub fn resize(&self, width: u32) -> Self {
        Self::wrapping_from_unsigned(self.bits, width)
    }
}

/// Returns the inclusive signed range of a `width`-bit two's-complement field.
pub fn signed_range(width: u32) -> (i64, i64) {
    if width >= 64 {
        (i64::MIN, i64::MAX)
    } else {
        let half = 1i64 << (width - 1);
        (-half, half - 1)
    }
}

impl fmt::Debug for FixedInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedInt({self})")
    }
}

impl fmt::Display for FixedInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.width.div_ceil(4) as usize;
        write!(f, "{}'h{:0digits$x}", self.width, self.bits)
    }
}

impl From<bool> for FixedInt {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}
