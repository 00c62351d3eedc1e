//! Replacement background generation

use crate::{
    background::BackgroundSpec,
    codec,
    color::Rgb,
    config::{DecodeLimits, PipelineConfig, ResampleFilter, ResizePolicy},
    error::Result,
    types::{PixelBuffer, Size},
};
use image::{imageops, RgbaImage};
use tracing::{debug, instrument};

/// Builds background buffers sized to a foreground
#[derive(Debug, Clone, Default)]
pub struct BackgroundSynthesizer {
    policy: ResizePolicy,
    filter: ResampleFilter,
    limits: DecodeLimits,
}

impl BackgroundSynthesizer {
    #[must_use]
    pub fn new(policy: ResizePolicy, filter: ResampleFilter, limits: DecodeLimits) -> Self {
        Self {
            policy,
            filter,
            limits,
        }
    }

    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.resize_policy,
            config.resample_filter,
            config.decode_limits,
        )
    }

    /// Uniform opaque fill of `size`
    #[must_use]
    pub fn solid_color(color: Rgb, size: Size) -> PixelBuffer {
        PixelBuffer::solid_rgba(size, color.to_rgba())
    }

    /// Decode a background image and fit it to exactly `target`
    ///
    /// With the default [`ResizePolicy::Stretch`] the aspect ratio is not
    /// preserved. The result is RGBA8; any alpha it carries is ignored by the
    /// compositor.
    ///
    /// # Errors
    /// - `Decode` under the same conditions as [`codec::decode`]
    #[instrument(skip(self, bytes), fields(len = bytes.len(), target = %target))]
    pub fn from_image(&self, bytes: &[u8], target: Size) -> Result<PixelBuffer> {
        let decoded = codec::decode_with_limits(bytes, &self.limits)?;
        let source = decoded.into_rgba().into_dynamic_image()?.to_rgba8();

        let fitted = if source.dimensions() == target.dimensions() {
            source
        } else {
            debug!(
                "Fitting {}x{} background to {} ({:?}, {:?})",
                source.width(),
                source.height(),
                target,
                self.policy,
                self.filter
            );
            match self.policy {
                ResizePolicy::Stretch => self.stretch(&source, target),
                ResizePolicy::Cover => self.cover(&source, target),
            }
        };

        PixelBuffer::from_rgba_image(fitted)
    }

    /// Build the background a spec asks for, or `None` when it asks for none
    pub fn create(&self, spec: BackgroundSpec, target: Size) -> Result<Option<PixelBuffer>> {
        match spec {
            BackgroundSpec::None => Ok(None),
            BackgroundSpec::SolidColor(color) => Ok(Some(Self::solid_color(color, target))),
            BackgroundSpec::ImageFile(bytes) => self.from_image(&bytes, target).map(Some),
        }
    }

    fn stretch(&self, source: &RgbaImage, target: Size) -> RgbaImage {
        imageops::resize(source, target.width(), target.height(), self.filter.into())
    }

    /// Centre crop to the target aspect ratio, then scale to `target`
    ///
    /// Cropping happens in source coordinates so no buffer larger than the
    /// source or the target is ever allocated.
    fn cover(&self, source: &RgbaImage, target: Size) -> RgbaImage {
        let (x, y, width, height) = cover_crop(source.dimensions(), target.dimensions());
        let cropped = imageops::crop_imm(source, x, y, width, height).to_image();
        if cropped.dimensions() == target.dimensions() {
            return cropped;
        }
        imageops::resize(&cropped, target.width(), target.height(), self.filter.into())
    }
}

/// Largest centred rectangle of `source` with the aspect ratio of `target`
///
/// Returns `(x, y, width, height)` in source pixels.
fn cover_crop(source: (u32, u32), target: (u32, u32)) -> (u32, u32, u32, u32) {
    let (sw, sh) = (u64::from(source.0), u64::from(source.1));
    let (tw, th) = (u64::from(target.0), u64::from(target.1));

    let (width, height) = if sw * th > tw * sh {
        // Source is wider than the target: keep full height
        (((tw * sh + th / 2) / th).clamp(1, sw), sh)
    } else {
        (sw, ((th * sw + tw / 2) / tw).clamp(1, sh))
    };

    // Both values are bounded by the u32 source dimensions
    let (width, height) = (width as u32, height as u32);
    ((source.0 - width) / 2, (source.1 - height) / 2, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelFormat;
    use image::{DynamicImage, ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(image: RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_solid_color_fills_every_pixel() {
        let size = Size::new(7, 3).unwrap();
        let color = Rgb::new(12, 34, 56);
        let buffer = BackgroundSynthesizer::solid_color(color, size);
        assert_eq!(buffer.dimensions(), (7, 3));
        assert_eq!(buffer.format(), PixelFormat::Rgba8);
        assert!(buffer.pixels().all(|px| px == [12, 34, 56, 255]));
    }

    #[test]
    fn test_stretch_matches_target_exactly() {
        let bytes = png_bytes(RgbaImage::from_pixel(40, 10, Rgba([0, 0, 255, 255])));
        let target = Size::new(25, 30).unwrap();
        let buffer = BackgroundSynthesizer::default().from_image(&bytes, target).unwrap();
        assert_eq!(buffer.dimensions(), (25, 30));
        // Uniform input stays uniform under a smooth filter
        let centre = buffer.pixel(12, 15).unwrap();
        assert!(centre[2] > 250 && centre[0] < 5);
    }

    #[test]
    fn test_same_size_background_is_untouched() {
        let source = RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8 * 60, y as u8 * 60, 7, 255]));
        let bytes = png_bytes(source.clone());
        let buffer = BackgroundSynthesizer::default()
            .from_image(&bytes, Size::new(4, 4).unwrap())
            .unwrap();
        assert_eq!(buffer.as_bytes(), source.as_raw().as_slice());
    }

    #[test]
    fn test_cover_crops_centre() {
        // Left third red, middle third green, right third blue
        let source = RgbaImage::from_fn(30, 10, |x, _| match x {
            0..=9 => Rgba([255, 0, 0, 255]),
            10..=19 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        let synthesizer = BackgroundSynthesizer::new(
            ResizePolicy::Cover,
            ResampleFilter::Triangle,
            DecodeLimits::default(),
        );
        let buffer = synthesizer
            .from_image(&png_bytes(source), Size::new(10, 10).unwrap())
            .unwrap();
        assert_eq!(buffer.dimensions(), (10, 10));
        let centre = buffer.pixel(5, 5).unwrap();
        assert!(centre[1] > 200, "centre should come from the green band: {centre:?}");
    }

    #[test]
    fn test_cover_crop_rectangle() {
        assert_eq!(cover_crop((30, 10), (10, 10)), (10, 0, 10, 10));
        assert_eq!(cover_crop((10, 30), (10, 10)), (0, 10, 10, 10));
        assert_eq!(cover_crop((40, 20), (20, 10)), (0, 0, 40, 20));
        assert_eq!(cover_crop((2000, 1), (300, 300)), (999, 0, 1, 1));
        assert_eq!(cover_crop((1, 2000), (400, 100)), (0, 999, 1, 1));
    }

    #[test]
    fn test_cover_extreme_aspect_stays_target_sized() {
        let source = RgbaImage::from_fn(2000, 1, |x, _| {
            if (900..1100).contains(&x) {
                Rgba([0, 200, 0, 255])
            } else {
                Rgba([200, 0, 0, 255])
            }
        });
        let synthesizer = BackgroundSynthesizer::new(
            ResizePolicy::Cover,
            ResampleFilter::Triangle,
            DecodeLimits::default(),
        );

        let started = std::time::Instant::now();
        let buffer = synthesizer
            .from_image(&png_bytes(source), Size::new(300, 300).unwrap())
            .unwrap();
        assert_eq!(buffer.dimensions(), (300, 300));
        assert!(buffer
            .pixels()
            .all(|px| px[0] < 10 && px[1] > 190 && px[3] == 255));
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn test_bad_background_bytes_are_decode_errors() {
        let err = BackgroundSynthesizer::default()
            .from_image(b"GIF89a nope", Size::new(2, 2).unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Decode);
    }

    #[test]
    fn test_create_dispatches_on_spec() {
        let synthesizer = BackgroundSynthesizer::default();
        let size = Size::new(3, 3).unwrap();
        assert!(synthesizer.create(BackgroundSpec::None, size).unwrap().is_none());

        let solid = synthesizer
            .create(BackgroundSpec::SolidColor(Rgb::WHITE), size)
            .unwrap()
            .unwrap();
        assert_eq!(solid.pixel(2, 2), Some(&[255, 255, 255, 255][..]));

        let bytes = png_bytes(RgbaImage::from_pixel(9, 1, Rgba([1, 1, 1, 255])));
        let image = synthesizer
            .create(BackgroundSpec::ImageFile(bytes), size)
            .unwrap()
            .unwrap();
        assert_eq!(image.dimensions(), (3, 3));
    }
}
