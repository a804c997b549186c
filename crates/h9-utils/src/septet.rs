//! 7-bit septet packing for MIDI system-exclusive payloads.
//!
//! Every byte between the `F0` and `F7` markers of a sysex message must
//! have its high bit clear. Wider quantities are therefore split into
//! septets, most significant first.
//!
//! # Checksum
//!
//! [`checksum_7bit`] is a plain additive checksum: the wrapping sum of all
//! payload bytes, masked to 7 bits. This is a hardware-conformance
//! assumption that still needs to be checked against a capture from a real
//! unit.

/// Largest value representable by two septets.
pub const MAX_14BIT: u16 = 0x3FFF;

/// Compute the additive 7-bit checksum of a payload.
///
/// # Examples
///
/// ```
/// use h9_utils::checksum_7bit;
///
/// assert_eq!(checksum_7bit(&[]), 0);
/// assert_eq!(checksum_7bit(&[0x7F, 0x01]), 0x00);
/// assert_eq!(checksum_7bit(&[0x10, 0x20, 0x30]), 0x60);
/// ```
#[inline]
pub const fn checksum_7bit(payload: &[u8]) -> u8 {
    let mut sum: u8 = 0;
    let mut i = 0;
    while i < payload.len() {
        sum = sum.wrapping_add(payload[i]);
        i += 1;
    }
    sum & 0x7F
}

/// Returns `true` when no byte has its high bit set.
#[inline]
pub const fn is_7bit_clean(bytes: &[u8]) -> bool {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] & 0x80 != 0 {
            return false;
        }
        i += 1;
    }
    true
}

/// Split a 14-bit value into `(msb, lsb)` septets.
///
/// Bits above 14 are discarded.
#[inline]
pub const fn split_14bit(value: u16) -> (u8, u8) {
    let value = value & MAX_14BIT;
    (((value >> 7) & 0x7F) as u8, (value & 0x7F) as u8)
}

/// Combine `(msb, lsb)` septets into a 14-bit value.
///
/// The high bit of each input is ignored.
#[inline]
pub const fn combine_14bit(msb: u8, lsb: u8) -> u16 {
    (((msb & 0x7F) as u16) << 7) | (lsb & 0x7F) as u16
}

/// Split a 16-bit value into three septets, most significant first.
///
/// # Examples
///
/// ```
/// use h9_utils::{combine_u16, split_u16};
///
/// assert_eq!(split_u16(0xFFFF), [0x03, 0x7F, 0x7F]);
/// assert_eq!(combine_u16(split_u16(0x1234)), 0x1234);
/// ```
#[inline]
pub const fn split_u16(value: u16) -> [u8; 3] {
    [
        ((value >> 14) & 0x03) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ]
}

/// Combine three septets (most significant first) into a 16-bit value.
#[inline]
pub const fn combine_u16(septets: [u8; 3]) -> u16 {
    (((septets[0] & 0x03) as u16) << 14)
        | (((septets[1] & 0x7F) as u16) << 7)
        | (septets[2] & 0x7F) as u16
}

/// Quantize a unit-interval value to 14-bit steps.
///
/// Input is clamped to `[0.0, 1.0]`; NaN maps to zero.
#[inline]
pub fn quantize_unit(value: f32) -> u16 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * MAX_14BIT as f32).round() as u16
}

/// Convert 14-bit steps back to the unit interval.
#[inline]
pub fn dequantize_unit(steps: u16) -> f32 {
    (steps & MAX_14BIT) as f32 / MAX_14BIT as f32
}
