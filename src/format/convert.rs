//! Sample format conversion between the routing format (i16) and device formats.

/// Converts f32 samples to i16.
///
/// Input should be in the range [-1.0, 1.0].
/// Values outside this range are clamped.
///
/// Uses × 32767 (not 32768) for symmetric scaling, so -1.0 maps to -32767.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Converts i16 samples to f32 in the range [-1.0, 1.0].
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Converts a signed i16 sample to the unsigned, offset-binary u16 encoding.
#[inline]
pub fn i16_to_u16(sample: i16) -> u16 {
    (i32::from(sample) + 32768) as u16
}
