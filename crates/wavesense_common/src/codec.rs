//! Bit-field codec for streaming words.
//!
//! Streaming interfaces carry one or more fixed-width lanes inside a wider
//! word, for example a 32-bit word with the real part in the high half and the
//! imaginary part in the low half. [`decode`] extracts one lane and optionally
//! sign-extends it; [`encode`] packs an ordered list of lanes
//! most-significant-field first.
//!
//! # Truncation
//!
//! Values that do not fit their lane are handled according to an explicit
//! [`Overflow`] policy chosen per interface:
//!
//! - [`Overflow::Reject`] returns [`CodecError::OutOfRange`].
//! - [`Overflow::Wrap`] keeps the low bits, which is two's-complement
//!   wraparound for signed lanes.

use crate::error::CodecError;
use crate::fixed::{check_width, signed_range, width_mask, FixedInt};
use serde::{Deserialize, Serialize};

/// What to do with a value that does not fit its lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    /// Fail with [`CodecError::OutOfRange`].
    #[default]
    Reject,
    /// Mask to the lane width.
    Wrap,
}

/// Position and interpretation of one lane inside a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Lane width in bits.
    pub width: u32,
    /// Bit offset of the lane's least significant bit.
    pub offset: u32,
    /// Whether the lane holds a two's-complement value.
    pub signed: bool,
}

impl FieldSpec {
    /// A signed lane.
    pub fn signed(width: u32, offset: u32) -> Self {
        Self {
            width,
            offset,
            signed: true,
        }
    }

    /// An unsigned lane.
    pub fn unsigned(width: u32, offset: u32) -> Self {
        Self {
            width,
            offset,
            signed: false,
        }
    }

    /// Extracts this lane from `raw`.
    pub fn decode(&self, raw: u64) -> Result<i64, CodecError> {
        decode(raw, self.width, self.offset, self.signed)
    }

    /// Writes `value` into this lane of `word`, leaving other bits untouched.
    pub fn insert(&self, word: u64, value: i64, overflow: Overflow) -> Result<u64, CodecError> {
        check_span(self.width, self.offset)?;
        let bits = fit(value, self.width, overflow)?;
        let mask = width_mask(self.width) << self.offset;
        Ok((word & !mask) | (bits << self.offset))
    }
}

fn check_span(width: u32, offset: u32) -> Result<(), CodecError> {
    check_width(width)?;
    if width + offset > 64 {
        return Err(CodecError::WordOverflow {
            total: width + offset,
            max: 64,
        });
    }
    Ok(())
}

/// Reduces `value` to `width` bits under `overflow`.
///
/// Under [`Overflow::Reject`] a value is accepted when it is representable as
/// either a signed or an unsigned `width`-bit integer.
fn fit(value: i64, width: u32, overflow: Overflow) -> Result<u64, CodecError> {
    if overflow == Overflow::Reject && width < 64 {
        let (min, _) = signed_range(width);
        let max_unsigned = width_mask(width) as i64;
        if value < min || value > max_unsigned {
            return Err(CodecError::OutOfRange {
                value: i128::from(value),
                width,
                signed: value < 0,
            });
        }
    }
    Ok(value as u64 & width_mask(width))
}

/// Extracts the `width`-bit field at `offset` from `raw`.
///
/// When `signed` is set and the field's top bit is set, the result is the
/// field value minus `2^width`. Unsigned 64-bit fields with the top bit set do
/// not fit an `i64` and are rejected.
pub fn decode(raw: u64, width: u32, offset: u32, signed: bool) -> Result<i64, CodecError> {
    check_span(width, offset)?;
    let field = FixedInt::wrapping_from_unsigned(raw >> offset, width);
    if signed {
        Ok(field.as_signed())
    } else if width == 64 && field.bit(63) {
        Err(CodecError::OutOfRange {
            value: i128::from(field.as_unsigned()),
            width,
            signed: false,
        })
    } else {
        Ok(field.as_unsigned() as i64)
    }
}

/// Packs `(value, width)` pairs into one word, first pair in the most
/// significant position.
pub fn encode(fields: &[(i64, u32)], overflow: Overflow) -> Result<u64, CodecError> {
    let mut total = 0u32;
    for &(_, width) in fields {
        check_width(width)?;
        total += width;
    }
    if total > 64 {
        return Err(CodecError::WordOverflow { total, max: 64 });
    }
    let mut word = 0u64;
    for &(value, width) in fields {
        let bits = fit(value, width, overflow)?;
        word = if width == 64 { bits } else { (word << width) | bits };
    }
    Ok(word)
}

/// Packs a complex sample into a 32-bit word, real part in the high half.
pub fn pack_iq(i: i16, q: i16) -> u32 {
    (u32::from(i as u16) << 16) | u32::from(q as u16)
}

/// Splits a 32-bit word into its real (high) and imaginary (low) halves.
pub fn unpack_iq(word: u32) -> (i16, i16) {
    ((word >> 16) as u16 as i16, word as u16 as i16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_sign_extends_top_bit() {
        assert_eq!(decode(0xFFFF, 16, 0, true).unwrap(), -1);
        assert_eq!(decode(0x8000, 16, 0, true).unwrap(), -32768);
        assert_eq!(decode(0x7FFF, 16, 0, true).unwrap(), 32767);
        assert_eq!(decode(0xFFFF, 16, 0, false).unwrap(), 65535);
    }

    #[test]
    fn decode_at_offset() {
        let word = 0xFFF0_0010u64;
        assert_eq!(decode(word, 16, 16, true).unwrap(), -16);
        assert_eq!(decode(word, 16, 0, true).unwrap(), 16);
        assert_eq!(decode(word, 4, 4, false).unwrap(), 1);
    }

    #[test]
    fn decode_rejects_bad_span() {
        assert_eq!(
            decode(0, 16, 56, true).unwrap_err(),
            CodecError::WordOverflow { total: 72, max: 64 }
        );
        assert!(decode(0, 0, 0, false).is_err());
        assert!(decode(u64::MAX, 64, 0, false).is_err());
        assert_eq!(decode(u64::MAX, 64, 0, true).unwrap(), -1);
    }

    #[test]
    fn encode_msb_first() {
        let word = encode(&[(-1, 16), (5, 16)], Overflow::Reject).unwrap();
        assert_eq!(word, 0xFFFF_0005);
        let word = encode(&[(1, 1), (0, 3), (7, 4)], Overflow::Reject).unwrap();
        assert_eq!(word, 0b1000_0111);
    }

    #[test]
    fn encode_reject_policy() {
        let err = encode(&[(70000, 16)], Overflow::Reject).unwrap_err();
        assert_eq!(
            err,
            CodecError::OutOfRange {
                value: 70000,
                width: 16,
                signed: false
            }
        );
        assert!(encode(&[(-32769, 16)], Overflow::Reject).is_err());
        // Unsigned upper range is accepted for lanes of unknown signedness.
        assert_eq!(encode(&[(65535, 16)], Overflow::Reject).unwrap(), 0xFFFF);
    }

    #[test]
    fn encode_wrap_policy() {
        assert_eq!(encode(&[(70000, 16)], Overflow::Wrap).unwrap(), 70000 & 0xFFFF);
        assert_eq!(encode(&[(-32769, 16)], Overflow::Wrap).unwrap(), 0x7FFF);
    }

    #[test]
    fn encode_rejects_wide_words() {
        assert_eq!(
            encode(&[(0, 32), (0, 33)], Overflow::Wrap).unwrap_err(),
            CodecError::WordOverflow { total: 65, max: 64 }
        );
    }

    #[test]
    fn encode_single_full_width_field() {
        assert_eq!(encode(&[(-1, 64)], Overflow::Reject).unwrap(), u64::MAX);
    }

    #[test]
    fn roundtrip_full_signed_range() {
        for width in [1u32, 4, 8, 12, 16] {
            let (min, max) = signed_range(width);
            for value in min..=max {
                let raw = encode(&[(value, width)], Overflow::Reject).unwrap();
                let decoded = decode(raw, width, 0, true).unwrap();
                assert_eq!(decoded, value, "width {width}");
                assert_eq!(encode(&[(decoded, width)], Overflow::Reject).unwrap(), raw);
            }
        }
    }

    #[test]
    fn field_insert_preserves_neighbours() {
        let hi = FieldSpec::signed(16, 16);
        let lo = FieldSpec::signed(16, 0);
        let word = hi.insert(0, -2, Overflow::Reject).unwrap();
        let word = lo.insert(word, 300, Overflow::Reject).unwrap();
        assert_eq!(word, 0xFFFE_012C);
        assert_eq!(hi.decode(word).unwrap(), -2);
        assert_eq!(lo.decode(word).unwrap(), 300);
        let word = hi.insert(word, 7, Overflow::Reject).unwrap();
        assert_eq!(lo.decode(word).unwrap(), 300);
    }

    #[test]
    fn iq_word_layout() {
        assert_eq!(pack_iq(-7, 5), 0xFFF9_0005);
        assert_eq!(unpack_iq(0xFFF9_0005), (-7, 5));
        assert_eq!(unpack_iq(pack_iq(i16::MIN, i16::MAX)), (i16::MIN, i16::MAX));
    }

    #[test]
    fn overflow_deserializes_lowercase() {
        let o: Overflow = serde_json::from_str("\"wrap\"").unwrap();
        assert_eq!(o, Overflow::Wrap);
        assert_eq!(Overflow::default(), Overflow::Reject);
    }
}
