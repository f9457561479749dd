//! Core types for the rasterizer

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::math::{Interval, Vec2, Vec3};
use crate::error::{RasterError, Result};

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from a shaded 0-255 float triple (clamped, truncated)
    pub fn from_shaded(c: Vec3) -> Self {
        Self::new(
            Interval::COLOR.clamp(c.x) as u8,
            Interval::COLOR.clamp(c.y) as u8,
            Interval::COLOR.clamp(c.z) as u8,
        )
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Flat-shaded triangle: one face normal shared by three vertices.
///
/// Layout matches the 12-float interchange record (n, v1, v2, v3).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Triangle {
    pub n: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub v3: Vec3,
}

impl Triangle {
    pub fn new(n: Vec3, v1: Vec3, v2: Vec3, v3: Vec3) -> Self {
        Self { n, v1, v2, v3 }
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v1, self.v2, self.v3]
    }
}

/// Smooth-shaded, textured triangle gathered from an indexed mesh
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObjTriangle {
    pub normals: [Vec3; 3],
    pub vertices: [Vec3; 3],
    pub uvs: [Vec2; 3],
}

/// Packed texel buffer addressed by normalized coordinates
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub texels: Vec<u8>,
}

impl Texture {
    pub fn new(width: usize, height: usize, channels: usize, texels: Vec<u8>) -> Result<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(RasterError::MalformedInput(format!(
                "texture must have 1, 3 or 4 channels, got {}",
                channels
            )));
        }
        if width == 0 || height == 0 {
            return Err(RasterError::MalformedInput(format!(
                "texture has empty dimensions {}x{}",
                width, height
            )));
        }
        if texels.len() != width * height * channels {
            return Err(RasterError::MalformedInput(format!(
                "texture buffer holds {} bytes, expected {}x{}x{}",
                texels.len(),
                width,
                height,
                channels
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            texels,
        })
    }

    /// Load texture from an image file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let img = image::open(path.as_ref())?;
        Self::from_image(img)
    }

    /// Load texture from encoded image bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        Self::from_image(img)
    }

    fn from_image(img: image::DynamicImage) -> Result<Self> {
        use image::GenericImageView;

        let (width, height) = img.dimensions();
        let (channels, texels) = match img {
            image::DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
            image::DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
            other => (4, other.to_rgba8().into_raw()),
        };
        Self::new(width as usize, height as usize, channels, texels)
    }

    /// Create a checkerboard test texture (RGBA), 4x4 texel squares
    pub fn checkerboard(width: usize, height: usize, color1: Color, color2: Color) -> Result<Self> {
        let mut texels = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / 4) + (y / 4)) % 2 == 0;
                let color = if checker { color1 } else { color2 };
                texels.extend_from_slice(&color.to_bytes());
            }
        }
        Self::new(width, height, 4, texels)
    }

    /// RGB of the texel at row-stride address `x * width + y`.
    ///
    /// Single-channel textures are expanded to gray.
    pub fn texel(&self, x: usize, y: usize) -> Result<[u8; 3]> {
        let idx = self.channels * (x * self.width + y);
        let px = self
            .texels
            .get(idx..idx + self.channels)
            .ok_or_else(|| {
                RasterError::OutOfBounds(format!(
                    "texel ({}, {}) outside {}x{} texture",
                    x, y, self.width, self.height
                ))
            })?;
        Ok(match self.channels {
            1 => [px[0]; 3],
            _ => [px[0], px[1], px[2]],
        })
    }

    /// Nearest-neighbor lookup at normalized coordinates in [0, 1].
    ///
    /// `nx` selects the column through `(height - 1) * nx`, `ny` the row
    /// through `(width - 1) * (1 - ny)`, so v=0 addresses the last row.
    /// Addressing is `x * width + y`, which only covers the buffer when
    /// `width <= height`: on wider textures some valid coordinates land past
    /// the end and fail with `OutOfBounds`, and the right-hand texels are
    /// never sampled.
    pub fn sample(&self, nx: f32, ny: f32) -> Result<[u8; 3]> {
        if !Interval::UNIT.contains(nx) || !Interval::UNIT.contains(ny) {
            return Err(RasterError::OutOfBounds(format!(
                "normalized coordinates ({}, {}) outside [0, 1]",
                nx, ny
            )));
        }
        let x = ((self.width - 1) as f32 * (1.0 - ny)) as usize;
        let y = ((self.height - 1) as f32 * nx) as usize;
        self.texel(x, y)
    }
}

/// Rasterizer settings, passed into every render call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    /// Direction the single directional light travels
    pub light_dir: Vec3,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            light_dir: Vec3::new(0.0, 0.0, -1.0),
        }
    }
}
