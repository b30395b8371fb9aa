//! sRGB ↔ linear conversions.
//!
//! Points carry linear RGB and all accumulation happens in linear space.
//! Conversion happens only at the boundaries: when a point cloud is loaded
//! and when the final image is encoded. Uses the exact sRGB transfer curve,
//! not a gamma 2.2 approximation.

/// Decode one sRGB-encoded channel in `[0, 1]` to linear.
pub fn srgb_to_linear(cs: f32) -> f32 {
    let cs = cs.clamp(0.0, 1.0);
    if cs <= 0.04045 {
        cs / 12.92
    } else {
        ((cs + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode one linear channel to sRGB in `[0, 1]`.
pub fn linear_to_srgb(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    if x <= 0.0031308 {
        12.92 * x
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

/// Convert sRGB u8 (0-255) to linear f32 (0.0-1.0).
///
/// ```
/// use ewa_splat::core::color::srgb_u8_to_linear_f32;
///
/// // Middle gray in sRGB (128) is about 0.21 in linear space
/// assert!((srgb_u8_to_linear_f32(128) - 0.2126).abs() < 0.01);
/// ```
pub fn srgb_u8_to_linear_f32(u: u8) -> f32 {
    srgb_to_linear(u as f32 / 255.0)
}

/// Convert linear f32 (0.0-1.0) to sRGB u8 (0-255).
pub fn linear_f32_to_srgb_u8(x: f32) -> u8 {
    (linear_to_srgb(x) * 255.0).round().clamp(0.0, 255.0) as u8
}
