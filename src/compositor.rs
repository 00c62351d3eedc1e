//! Alpha compositing of a foreground cutout over a background

use crate::{
    error::{CompositeError, Result},
    types::{CompositeResult, ForegroundResult, PixelBuffer, PixelFormat, Size},
};
use tracing::{debug, instrument};

/// Blend one 8-bit channel: `fg * a/255 + bg * (1 - a/255)`, rounded half up
#[inline]
fn blend_channel(fg: u8, bg: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    let mixed = (u32::from(fg) * a + u32::from(bg) * (255 - a) + 127) / 255;
    // The weights sum to 255, so `mixed` never exceeds 255
    mixed as u8
}

fn ensure_same_size(foreground: Size, background: Size) -> Result<()> {
    if foreground == background {
        Ok(())
    } else {
        Err(CompositeError::dimension_mismatch(
            foreground.dimensions(),
            background.dimensions(),
        ))
    }
}

/// Composite `foreground` over `background`
///
/// Soft alpha values are blended linearly. The output is opaque. Only the RGB
/// channels of the background are used, so an RGBA background behaves as if
/// its alpha were 255.
///
/// # Errors
/// - `DimensionMismatch` when the two sizes differ; nothing is cropped or
///   rescaled here
#[instrument(skip_all, fields(size = %foreground.size()))]
pub fn blend(foreground: ForegroundResult, background: &PixelBuffer) -> Result<CompositeResult> {
    ensure_same_size(foreground.size(), background.size())?;

    let fg = foreground.into_buffer();
    let (width, height) = fg.dimensions();
    let bg_channels = background.format().channels();
    debug!("Blending over {} background", background.format());

    let mut data = Vec::with_capacity(fg.as_bytes().len());
    for (fg_px, bg_px) in fg.pixels().zip(background.as_bytes().chunks_exact(bg_channels)) {
        let alpha = fg_px[3];
        for c in 0..3 {
            data.push(blend_channel(fg_px[c], bg_px[c], alpha));
        }
        data.push(u8::MAX);
    }

    let buffer = PixelBuffer::new(width, height, PixelFormat::Rgba8, data)?;
    Ok(CompositeResult::new(buffer))
}

/// Final image when no replacement background was requested
///
/// The cutout keeps its alpha channel untouched.
#[must_use]
pub fn passthrough(foreground: ForegroundResult) -> PixelBuffer {
    foreground.into_buffer()
}
