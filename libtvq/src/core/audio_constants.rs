//! sample scaling between normalized audio and the codec's 16-bit range

/// Maximum positive value for 16-bit signed integer (2^15 - 1)
pub const I16_MAX_F32: f32 = 32767.0;

/// Minimum value for 16-bit signed integer (-2^15)
pub const I16_MIN_F32: f32 = -32768.0;

/// full-scale amplitude the codec works at
pub const CODEC_FULL_SCALE: f32 = 32768.0;

/// Inverse of CODEC_FULL_SCALE, used for codec -> normalized conversion
pub const CODEC_TO_F32_SCALE: f32 = 1.0 / CODEC_FULL_SCALE;

/// normalized (-1.0..1.0) sample to codec range
#[inline]
pub fn to_codec_range(sample: f32) -> f32 {
    sample * CODEC_FULL_SCALE
}

/// codec range sample back to normalized, clipped to -1.0..1.0
#[inline]
pub fn from_codec_range(sample: f32) -> f32 {
    (sample * CODEC_TO_F32_SCALE).clamp(-1.0, 1.0)
}

/// codec range sample to i16 with clipping
#[inline]
pub fn codec_to_i16(sample: f32) -> i16 {
    sample.round().clamp(I16_MIN_F32, I16_MAX_F32) as i16
}
