//! Image decoding and encoding
//!
//! Decoding accepts exactly the upload formats the product offers. Encoding is
//! always PNG so transparency from background removal is never lost.

use crate::{
    config::DecodeLimits,
    error::{CompositeError, Result},
    types::PixelBuffer,
};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, instrument};

/// Raster formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedFormat {
    Png,
    Jpeg,
    WebP,
    Bmp,
}

impl SupportedFormat {
    pub const ALL: [SupportedFormat; 4] = [Self::Png, Self::Jpeg, Self::WebP, Self::Bmp];

    /// Map a detected `image` format onto the accepted set
    #[must_use]
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::WebP => Some(Self::WebP),
            ImageFormat::Bmp => Some(Self::Bmp),
            _ => None,
        }
    }

    #[must_use]
    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::WebP => ImageFormat::WebP,
            Self::Bmp => ImageFormat::Bmp,
        }
    }

    /// File extensions offered in upload dialogs
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Png => &["png"],
            Self::Jpeg => &["jpg", "jpeg"],
            Self::WebP => &["webp"],
            Self::Bmp => &["bmp"],
        }
    }
}

impl std::fmt::Display for SupportedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::WebP => "WebP",
            Self::Bmp => "BMP",
        };
        f.write_str(name)
    }
}

/// Check if a file path has a supported image extension
pub fn is_supported_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| {
            SupportedFormat::ALL
                .iter()
                .any(|f| f.extensions().contains(&ext.as_str()))
        })
}

/// Detect the format of encoded bytes from their content
///
/// # Errors
/// - `Decode` when the content is not a recognised, supported format
pub fn detect_format(bytes: &[u8]) -> Result<SupportedFormat> {
    let detected = image::guess_format(bytes)
        .map_err(|e| CompositeError::decode(format!("Unrecognised image data: {}", e)))?;
    SupportedFormat::from_image_format(detected).ok_or_else(|| {
        CompositeError::decode(format!(
            "Unsupported image format {:?}. Supported formats: PNG, JPEG, WebP, BMP",
            detected
        ))
    })
}

/// Decode uploaded bytes with default limits
///
/// # Errors
/// - `Decode` for unsupported, truncated or corrupt data
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer> {
    decode_with_limits(bytes, &DecodeLimits::default())
}

/// Decode uploaded bytes, refusing images beyond `limits`
///
/// Oversized images are reported as ordinary decode errors.
///
/// # Errors
/// - `Decode` for empty, unsupported, truncated, corrupt or oversized data
#[instrument(skip(bytes, limits), fields(len = bytes.len()))]
pub fn decode_with_limits(bytes: &[u8], limits: &DecodeLimits) -> Result<PixelBuffer> {
    if bytes.is_empty() {
        return Err(CompositeError::decode("Image data is empty"));
    }

    let format = detect_format(bytes)?;

    let mut reader = ImageReader::with_format(Cursor::new(bytes), format.image_format());
    reader.limits(limits.to_image_limits());

    let image = reader.decode().map_err(|e| {
        CompositeError::decode(format!(
            "Failed to decode {} image ({} bytes): {}",
            format,
            bytes.len(),
            e
        ))
    })?;

    debug!(
        "Decoded {} image {}x{} ({:?})",
        format,
        image.width(),
        image.height(),
        image.color()
    );

    PixelBuffer::from_dynamic(image).map_err(|e| CompositeError::decode(e.to_string()))
}

/// Encode a buffer as PNG
///
/// The PNG encoder is deterministic: the same buffer always yields the same bytes.
///
/// # Errors
/// - `Encode` when the buffer cannot be serialised
#[instrument(skip(buffer), fields(width = buffer.width(), height = buffer.height()))]
pub fn encode(buffer: &PixelBuffer) -> Result<Vec<u8>> {
    let image = buffer
        .clone()
        .into_dynamic_image()
        .map_err(|e| CompositeError::encode(e.to_string()))?;

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| CompositeError::encode(format!("Failed to encode PNG: {}", e)))?;

    debug!("Encoded {} buffer as {} PNG bytes", buffer.format(), bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelFormat;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

    fn encode_as(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_decode_png_keeps_alpha() {
        let source = RgbaImage::from_pixel(6, 4, Rgba([10, 20, 30, 128]));
        let bytes = encode_as(&DynamicImage::ImageRgba8(source), ImageFormat::Png);

        let buffer = decode(&bytes).unwrap();
        assert_eq!(buffer.dimensions(), (6, 4));
        assert_eq!(buffer.format(), PixelFormat::Rgba8);
        assert_eq!(buffer.pixel(5, 3), Some(&[10, 20, 30, 128][..]));
    }

    #[test]
    fn test_decode_jpeg_and_bmp() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 100, 50])));

        let jpeg = decode(&encode_as(&source, ImageFormat::Jpeg)).unwrap();
        assert_eq!(jpeg.dimensions(), (8, 8));
        assert_eq!(jpeg.format(), PixelFormat::Rgb8);

        let bmp = decode(&encode_as(&source, ImageFormat::Bmp)).unwrap();
        assert_eq!(bmp.dimensions(), (8, 8));
        assert_eq!(bmp.pixel(0, 0), Some(&[200, 100, 50][..]));
    }

    #[cfg(feature = "webp-support")]
    #[test]
    fn test_decode_webp() {
        let source = RgbaImage::from_fn(7, 5, |x, y| {
            Rgba([x as u8 * 30, y as u8 * 40, 90, 255 - x as u8])
        });
        let bytes = encode_as(&DynamicImage::ImageRgba8(source.clone()), ImageFormat::WebP);
        assert!(bytes.starts_with(b"RIFF"));

        let buffer = decode(&bytes).unwrap();
        assert_eq!(buffer.dimensions(), (7, 5));
        assert_eq!(buffer.format(), PixelFormat::Rgba8);
        assert_eq!(buffer.as_bytes(), source.as_raw().as_slice());
    }

    #[test]
    fn test_decode_rejects_garbage_and_empty() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Decode);

        let err = decode(&[]).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Decode);
    }

    #[test]
    fn test_decode_rejects_truncated_png() {
        let source = RgbImage::from_fn(32, 32, |x, y| Rgb([x as u8 * 8, y as u8 * 8, 0]));
        let bytes = encode_as(&DynamicImage::ImageRgb8(source), ImageFormat::Png);
        let truncated = &bytes[..bytes.len() / 2];

        let err = decode(truncated).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Decode);
    }

    #[test]
    fn test_decode_rejects_unsupported_format() {
        // TIFF magic: recognised by the image crate but not an accepted upload type
        let err = detect_format(b"II*\0\x08\0\0\0").unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }

    #[test]
    fn test_decode_limits_reject_oversized() {
        let source = DynamicImage::ImageRgb8(RgbImage::new(64, 16));
        let bytes = encode_as(&source, ImageFormat::Png);
        let limits = DecodeLimits {
            max_width: 32,
            ..DecodeLimits::default()
        };

        let err = decode_with_limits(&bytes, &limits).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Decode);
        assert!(decode(&bytes).is_ok());
    }

    #[test]
    fn test_encode_is_png_and_lossless() {
        let data: Vec<u8> = (0..4 * 3 * 4).map(|i| (i * 5) as u8).collect();
        let buffer = PixelBuffer::new(4, 3, PixelFormat::Rgba8, data).unwrap();

        let bytes = encode(&buffer).unwrap();
        assert_eq!(detect_format(&bytes).unwrap(), SupportedFormat::Png);
        assert_eq!(decode(&bytes).unwrap(), buffer);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let buffer = PixelBuffer::new(2, 1, PixelFormat::Rgb8, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(encode(&buffer).unwrap(), encode(&buffer).unwrap());
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_extension("photo.JPG"));
        assert!(is_supported_extension("dir/shot.webp"));
        assert!(is_supported_extension("scan.bmp"));
        assert!(!is_supported_extension("anim.gif"));
        assert!(!is_supported_extension("noext"));
    }
}
