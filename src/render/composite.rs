//! Compositor: visible layer → pixel color, and the final frame buffer.
//!
//! Color is the weight-normalized average of the layer's colors. Alpha is the
//! layer's summed unnormalized coverage, so interior pixels are opaque and
//! silhouettes fade out smoothly over the kernel tails.

use crate::core::color::linear_f32_to_srgb_u8;
use crate::render::accum::AccumulationCell;
use crate::render::resolve::{nearest_layer, Layer};
use image::{Rgba, RgbaImage};
use nalgebra::Vector3;

/// A resolved pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pixel {
    /// No layer with meaningful weight reached this pixel
    Untouched,
    /// Linear RGB in [0, 1] and coverage alpha in [0, 1]
    Color { rgb: Vector3<f32>, alpha: f32 },
}

impl Pixel {
    pub fn is_touched(&self) -> bool {
        matches!(self, Pixel::Color { .. })
    }
}

/// Turn the visible layer into a pixel.
///
/// A layer whose weight is at or below `weight_epsilon` leaves the pixel
/// untouched; it still hides anything behind it.
pub fn composite_layer(layer: Option<&Layer>, weight_epsilon: f64) -> Pixel {
    let Some(layer) = layer else {
        return Pixel::Untouched;
    };
    if !(layer.weight > weight_epsilon) {
        return Pixel::Untouched;
    }

    let rgb = (layer.weighted_color / layer.weight)
        .map(|c| c.clamp(0.0, 1.0))
        .cast::<f32>();
    let alpha = layer.coverage.clamp(0.0, 1.0) as f32;
    Pixel::Color { rgb, alpha }
}

/// Resolve and composite one accumulation cell.
pub fn composite_cell(cell: &mut AccumulationCell, thickness: f32, weight_epsilon: f64) -> Pixel {
    composite_layer(nearest_layer(cell, thickness).as_ref(), weight_epsilon)
}

/// Row-major grid of resolved pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pixels: Vec<Pixel>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::Untouched; width as usize * height as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Pixel {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, pixel: Pixel) {
        let idx = (y * self.width + x) as usize;
        self.pixels[idx] = pixel;
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn touched_count(&self) -> usize {
        self.pixels.iter().filter(|p| p.is_touched()).count()
    }

    /// Encode to sRGB RGBA8.
    ///
    /// Without a background, untouched pixels are fully transparent and
    /// colors keep straight alpha. With one, every pixel is blended over it
    /// in linear space and the result is opaque.
    pub fn to_rgba8(&self, background: Option<Vector3<f32>>) -> RgbaImage {
        let mut image = RgbaImage::new(self.width, self.height);
        for (i, pixel) in self.pixels.iter().enumerate() {
            let x = i as u32 % self.width;
            let y = i as u32 / self.width;
            image.put_pixel(x, y, encode(pixel, background));
        }
        image
    }
}

fn encode(pixel: &Pixel, background: Option<Vector3<f32>>) -> Rgba<u8> {
    let srgb = |c: Vector3<f32>| c.map(linear_f32_to_srgb_u8);

    match (pixel, background) {
        (Pixel::Untouched, None) => Rgba([0, 0, 0, 0]),
        (Pixel::Untouched, Some(bg)) => {
            let c = srgb(bg);
            Rgba([c.x, c.y, c.z, 255])
        }
        (Pixel::Color { rgb, alpha }, None) => {
            let c = srgb(*rgb);
            Rgba([c.x, c.y, c.z, (alpha * 255.0).round() as u8])
        }
        (Pixel::Color { rgb, alpha }, Some(bg)) => {
            let c = srgb(rgb * *alpha + bg * (1.0 - alpha));
            Rgba([c.x, c.y, c.z, 255])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::accum::Contribution;
    use approx::assert_relative_eq;

    fn layer(weight: f64, coverage: f64, color: [f64; 3]) -> Layer {
        Layer {
            min_depth: 1.0,
            max_depth: 1.0,
            count: 1,
            weight,
            coverage,
            weighted_color: Vector3::from(color) * weight,
        }
    }

    #[test]
    fn test_no_layer_is_untouched() {
        assert_eq!(composite_layer(None, 1e-10), Pixel::Untouched);
    }

    #[test]
    fn test_negligible_weight_is_untouched() {
        let faint = layer(1e-11, 0.5, [1.0, 0.0, 0.0]);
        assert_eq!(composite_layer(Some(&faint), 1e-10), Pixel::Untouched);
    }

    #[test]
    fn test_color_is_weight_normalized_and_alpha_clamped() {
        let pixel = composite_layer(Some(&layer(0.02, 3.0, [0.2, 0.4, 0.6])), 1e-10);
        let Pixel::Color { rgb, alpha } = pixel else {
            panic!("expected a colored pixel");
        };
        assert_relative_eq!(rgb, Vector3::new(0.2, 0.4, 0.6), epsilon = 1e-6);
        assert_eq!(alpha, 1.0);
    }

    #[test]
    fn test_partial_coverage_gives_partial_alpha() {
        let pixel = composite_layer(Some(&layer(0.01, 0.25, [1.0, 1.0, 1.0])), 1e-10);
        assert!(matches!(pixel, Pixel::Color { alpha, .. } if (alpha - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_composite_cell_uses_front_layer_only() {
        let mut cell = AccumulationCell::new();
        for (depth, color) in [(2.0, [0.0, 0.0, 1.0]), (1.0, [1.0, 0.0, 0.0])] {
            cell.push(Contribution {
                depth,
                weight: 0.5,
                coverage: 1.0,
                weighted_color: Vector3::from(color) * 0.5,
            });
        }
        let pixel = composite_cell(&mut cell, 0.1, 1e-10);
        assert_eq!(
            pixel,
            Pixel::Color {
                rgb: Vector3::new(1.0, 0.0, 0.0),
                alpha: 1.0
            }
        );
    }

    #[test]
    fn test_to_rgba8_transparent_and_background() {
        let mut frame = FrameBuffer::new(2, 1);
        frame.set(
            1,
            0,
            Pixel::Color {
                rgb: Vector3::new(1.0, 0.0, 0.0),
                alpha: 0.5,
            },
        );
        assert_eq!(frame.touched_count(), 1);

        let straight = frame.to_rgba8(None);
        assert_eq!(*straight.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*straight.get_pixel(1, 0), Rgba([255, 0, 0, 128]));

        let over_white = frame.to_rgba8(Some(Vector3::repeat(1.0)));
        assert_eq!(*over_white.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        let blended = over_white.get_pixel(1, 0);
        assert_eq!(blended[0], 255);
        assert_eq!(blended[3], 255);
        // Linear 0.5 encodes to sRGB ~188.
        assert!((185..=190).contains(&blended[1]));
    }
}
