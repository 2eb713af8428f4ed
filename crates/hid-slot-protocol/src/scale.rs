//! Saturating fixed-point scaling primitives for the wire format.
//!
//! All conversions saturate; nothing wraps or panics on extreme inputs.

/// Saturate a value into the unsigned 16-bit range.
pub fn saturate_u16(x: i64) -> u16 {
    x.clamp(0, 0xffff) as u16
}

/// Saturate a value into the signed 16-bit range.
pub fn saturate_s16(x: i32) -> i16 {
    x.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Scale a saturated unsigned 16-bit value down to `bits` bits.
pub fn scale_u16(x: i64, bits: u32) -> u16 {
    debug_assert!(bits <= 16);
    saturate_u16(x) >> (16 - bits)
}

/// Scale a condition coefficient to `bits` bits of magnitude.
///
/// Coefficients span ±0x7fff but the firmware's fields cover twice that
/// resolution, hence the doubling before the shift. Sign is carried
/// separately in dedicated sign bits.
pub fn scale_coeff(x: i32, bits: u32) -> u8 {
    debug_assert!(bits <= 8);
    scale_u16(i64::from(x.unsigned_abs()) * 2, bits) as u8
}

/// Translate a signed force level to the unsigned 8-bit wire byte
/// (0x80 = no force).
pub fn translate_force(level: i32) -> u8 {
    ((i32::from(saturate_s16(level)) + 0x8000) >> 8) as u8
}
