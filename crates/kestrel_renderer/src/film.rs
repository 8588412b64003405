//! Linear radiance storage and 8-bit output.

use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};
use kestrel_math::Vec3;

use crate::error::RenderResult;

/// sRGB transfer function for one linear channel in `[0, 1]`.
#[inline]
pub fn linear_to_srgb(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    if v <= 0.0031308 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Convert a linear color to 8-bit sRGBA.
pub fn color_to_rgba(color: Vec3) -> [u8; 4] {
    let encode = |v: f32| (255.0 * linear_to_srgb(v) + 0.5) as u8;
    [encode(color.x), encode(color.y), encode(color.z), 255]
}

/// Row-major image of linear RGB radiance.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec3>,
}

impl ImageBuffer {
    /// Black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec3::ZERO; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Vec3) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Gamma-encoded RGBA bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }

    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| Rgba(color_to_rgba(self.get(x, y))))
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        let path = path.as_ref();
        self.to_image().save_with_format(path, ImageFormat::Png)?;
        log::info!("Wrote {}x{} image to {}", self.width, self.height, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_curve() {
        assert_eq!(linear_to_srgb(0.0), 0.0);
        assert!((linear_to_srgb(1.0) - 1.0).abs() < 1e-6);
        // linear segment
        assert!((linear_to_srgb(0.002) - 0.02584).abs() < 1e-5);
        // mid grey encodes to roughly 0.735
        assert!((linear_to_srgb(0.5) - 0.7354).abs() < 1e-3, "srgb(0.5) = {}", linear_to_srgb(0.5));
        // out of range input is clamped
        assert_eq!(linear_to_srgb(-1.0), 0.0);
        assert!((linear_to_srgb(4.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Vec3::ZERO), [0, 0, 0, 255]);
        assert_eq!(color_to_rgba(Vec3::ONE), [255, 255, 255, 255]);
    }

    #[test]
    fn test_image_buffer_layout() {
        let mut image = ImageBuffer::new(3, 2);
        image.set(2, 1, Vec3::ONE);
        assert_eq!(image.get(2, 1), Vec3::ONE);
        assert_eq!(image.pixels[5], Vec3::ONE);

        let bytes = image.to_rgba8();
        assert_eq!(bytes.len(), 3 * 2 * 4);
        assert_eq!(&bytes[20..24], &[255, 255, 255, 255]);
        assert_eq!(image.to_image().get_pixel(2, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_save_png() {
        let mut image = ImageBuffer::new(4, 4);
        image.set(1, 1, Vec3::new(1.0, 0.0, 0.0));
        let path = std::env::temp_dir().join(format!("kestrel_film_{}.png", std::process::id()));
        image.save_png(&path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(1, 1).0, [255, 0, 0, 255]);
        let _ = std::fs::remove_file(&path);
    }
}
