//! Core pixel types passed between pipeline stages

use crate::error::{CompositeError, Result};
use image::{DynamicImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Channel layout of a [`PixelBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGB, 3 bytes per pixel
    Rgb8,
    /// 8-bit RGB plus straight (non-premultiplied) alpha, 4 bytes per pixel
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel
    #[must_use]
    pub fn channels(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }

    #[must_use]
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba8)
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rgb8 => write!(f, "RGB8"),
            Self::Rgba8 => write!(f, "RGBA8"),
        }
    }
}

/// Positive image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    width: u32,
    height: u32,
}

impl Size {
    /// Create a size, rejecting zero width or height
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CompositeError::invalid_buffer(format!(
                "dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    #[must_use]
    pub fn width(self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(self) -> u32 {
        self.height
    }

    /// `(width, height)` tuple, as the `image` crate reports dimensions
    #[must_use]
    pub fn dimensions(self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Decoded raster image in row-major order
///
/// A buffer is never mutated after construction. Stages consume or borrow a
/// buffer and produce a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    size: Size,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw channel data, checking that its length matches the dimensions
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let size = Size::new(width, height)?;
        let expected = size.pixel_count() * format.channels();
        if data.len() != expected {
            return Err(CompositeError::invalid_buffer(format!(
                "{} {} buffer needs {} bytes, got {}",
                size,
                format,
                expected,
                data.len()
            )));
        }
        Ok(Self { size, format, data })
    }

    /// Buffer where every pixel has the same channel values
    pub fn filled(size: Size, format: PixelFormat, pixel: &[u8]) -> Result<Self> {
        if pixel.len() != format.channels() {
            return Err(CompositeError::invalid_buffer(format!(
                "{} pixel needs {} channels, got {}",
                format,
                format.channels(),
                pixel.len()
            )));
        }
        let data = pixel.repeat(size.pixel_count());
        Ok(Self { size, format, data })
    }

    /// Uniform RGBA fill
    #[must_use]
    pub fn solid_rgba(size: Size, pixel: [u8; 4]) -> Self {
        Self {
            size,
            format: PixelFormat::Rgba8,
            data: pixel.repeat(size.pixel_count()),
        }
    }

    pub fn from_rgba_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, PixelFormat::Rgba8, image.into_raw())
    }

    pub fn from_rgb_image(image: RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, PixelFormat::Rgb8, image.into_raw())
    }

    /// Normalise any decoded image to 8-bit RGB or RGBA
    ///
    /// Images with an alpha channel (including grey+alpha and 16-bit variants)
    /// become `Rgba8`; everything else becomes `Rgb8`.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        match image {
            DynamicImage::ImageRgba8(rgba) => Self::from_rgba_image(rgba),
            DynamicImage::ImageRgb8(rgb) => Self::from_rgb_image(rgb),
            other if other.color().has_alpha() => Self::from_rgba_image(other.to_rgba8()),
            other => Self::from_rgb_image(other.to_rgb8()),
        }
    }

    /// Convert into the `image` crate's representation without copying
    pub fn into_dynamic_image(self) -> Result<DynamicImage> {
        let (width, height) = self.size.dimensions();
        let image = match self.format {
            PixelFormat::Rgb8 => RgbImage::from_raw(width, height, self.data).map(DynamicImage::ImageRgb8),
            PixelFormat::Rgba8 => {
                RgbaImage::from_raw(width, height, self.data).map(DynamicImage::ImageRgba8)
            },
        };
        image.ok_or_else(|| CompositeError::invalid_buffer("raw data shorter than dimensions"))
    }

    /// Convert to RGBA, filling alpha with 255 when the source has none
    #[must_use]
    pub fn into_rgba(self) -> Self {
        match self.format {
            PixelFormat::Rgba8 => self,
            PixelFormat::Rgb8 => {
                let mut data = Vec::with_capacity(self.size.pixel_count() * 4);
                for px in self.data.chunks_exact(3) {
                    data.extend_from_slice(px);
                    data.push(u8::MAX);
                }
                Self {
                    size: self.size,
                    format: PixelFormat::Rgba8,
                    data,
                }
            },
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.size.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.size.height
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.size.dimensions()
    }

    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Iterate pixels as channel slices in row-major order
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.format.channels())
    }

    /// Channel values at `(x, y)`, or `None` when out of bounds
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let channels = self.format.channels();
        let start = (y as usize * self.size.width as usize + x as usize) * channels;
        self.data.get(start..start + channels)
    }
}

/// RGBA cutout produced by the segmentation stage
///
/// Alpha 0 marks removed background, 255 kept foreground, anything between is a
/// soft edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundResult(PixelBuffer);

impl ForegroundResult {
    /// Wrap a buffer, requiring it to carry an alpha channel
    pub fn new(buffer: PixelBuffer) -> Result<Self> {
        if buffer.format() != PixelFormat::Rgba8 {
            return Err(CompositeError::invalid_buffer(format!(
                "foreground must be RGBA8, got {}",
                buffer.format()
            )));
        }
        Ok(Self(buffer))
    }

    #[must_use]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.0
    }

    #[must_use]
    pub fn into_buffer(self) -> PixelBuffer {
        self.0
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.0.size()
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    /// Alpha channel values in row-major order
    pub fn alpha(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.pixels().map(|px| px.get(3).copied().unwrap_or(u8::MAX))
    }

    /// Summary of how much of the frame the model kept
    #[must_use]
    pub fn coverage(&self) -> MaskCoverage {
        let mut coverage = MaskCoverage::default();
        for a in self.alpha() {
            match a {
                0 => coverage.transparent += 1,
                u8::MAX => coverage.opaque += 1,
                _ => coverage.partial += 1,
            }
        }
        coverage
    }
}

/// Pixel counts by alpha class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskCoverage {
    pub transparent: usize,
    pub partial: usize,
    pub opaque: usize,
}

impl MaskCoverage {
    #[must_use]
    pub fn total(&self) -> usize {
        self.transparent + self.partial + self.opaque
    }

    /// Fraction of pixels with any foreground contribution
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.partial + self.opaque) as f32 / total as f32
    }
}

/// Opaque blended image, same dimensions as the foreground it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeResult(PixelBuffer);

impl CompositeResult {
    pub(crate) fn new(buffer: PixelBuffer) -> Self {
        Self(buffer)
    }

    #[must_use]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.0
    }

    #[must_use]
    pub fn into_buffer(self) -> PixelBuffer {
        self.0
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_size_rejects_zero() {
        assert!(Size::new(0, 10).is_err());
        assert!(Size::new(10, 0).is_err());
        let size = Size::new(3, 2).unwrap();
        assert_eq!(size.pixel_count(), 6);
        assert_eq!(size.to_string(), "3x2");
    }

    #[test]
    fn test_buffer_length_checked() {
        assert!(PixelBuffer::new(2, 2, PixelFormat::Rgb8, vec![0; 12]).is_ok());
        assert!(PixelBuffer::new(2, 2, PixelFormat::Rgba8, vec![0; 12]).is_err());
        assert!(PixelBuffer::new(0, 2, PixelFormat::Rgb8, vec![]).is_err());
    }

    #[test]
    fn test_pixel_access() {
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let buffer = PixelBuffer::new(2, 2, PixelFormat::Rgb8, data).unwrap();
        assert_eq!(buffer.pixel(1, 0), Some(&[4, 5, 6][..]));
        assert_eq!(buffer.pixel(0, 1), Some(&[7, 8, 9][..]));
        assert_eq!(buffer.pixel(2, 0), None);
        assert_eq!(buffer.pixels().count(), 4);
    }

    #[test]
    fn test_into_rgba_fills_opaque_alpha() {
        let buffer = PixelBuffer::new(1, 2, PixelFormat::Rgb8, vec![9, 8, 7, 6, 5, 4]).unwrap();
        let rgba = buffer.into_rgba();
        assert_eq!(rgba.format(), PixelFormat::Rgba8);
        assert_eq!(rgba.as_bytes(), &[9, 8, 7, 255, 6, 5, 4, 255]);
    }

    #[test]
    fn test_dynamic_round_trip_keeps_alpha() {
        let image = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 40]));
        let buffer = PixelBuffer::from_dynamic(DynamicImage::ImageRgba8(image.clone())).unwrap();
        assert_eq!(buffer.dimensions(), (4, 3));
        let back = buffer.into_dynamic_image().unwrap();
        assert_eq!(back.to_rgba8(), image);
    }

    #[test]
    fn test_dynamic_luma_becomes_rgb() {
        let gray = DynamicImage::new_luma8(5, 5);
        let buffer = PixelBuffer::from_dynamic(gray).unwrap();
        assert_eq!(buffer.format(), PixelFormat::Rgb8);
    }

    #[test]
    fn test_foreground_requires_alpha() {
        let rgb = PixelBuffer::filled(Size::new(2, 2).unwrap(), PixelFormat::Rgb8, &[1, 2, 3]).unwrap();
        assert!(ForegroundResult::new(rgb).is_err());
    }

    #[test]
    fn test_mask_coverage() {
        let data = vec![
            0, 0, 0, 0, //
            0, 0, 0, 128, //
            0, 0, 0, 255, //
            0, 0, 0, 255,
        ];
        let buffer = PixelBuffer::new(2, 2, PixelFormat::Rgba8, data).unwrap();
        let coverage = ForegroundResult::new(buffer).unwrap().coverage();
        assert_eq!(coverage.transparent, 1);
        assert_eq!(coverage.partial, 1);
        assert_eq!(coverage.opaque, 2);
        assert!((coverage.foreground_ratio() - 0.75).abs() < f32::EPSILON);
    }
}
