//! Adapter for models that predict a grey-scale alpha matte

use crate::{
    remover::SegmentationModel,
    types::{PixelBuffer, PixelFormat},
};
use anyhow::Context;
use image::{imageops::FilterType, GrayImage};
use tracing::debug;

/// Wraps a matte predictor as a [`SegmentationModel`]
///
/// Many segmentation networks output a single-channel probability map, often at
/// their own fixed resolution. The matte is resized to the input (Lanczos3 when
/// sizes differ) and attached to the input pixels as straight alpha.
pub struct MatteModel<F> {
    predict: F,
    name: String,
}

impl<F> MatteModel<F>
where
    F: Fn(&PixelBuffer) -> anyhow::Result<GrayImage> + Send + Sync,
{
    pub fn new<S: Into<String>>(name: S, predict: F) -> Self {
        Self {
            predict,
            name: name.into(),
        }
    }
}

/// Attach a matte to an image as its alpha channel
///
/// # Errors
/// Fails when the matte is empty.
pub fn apply_matte(input: &PixelBuffer, matte: &GrayImage) -> anyhow::Result<PixelBuffer> {
    let (width, height) = input.dimensions();
    if matte.width() == 0 || matte.height() == 0 {
        anyhow::bail!("matte is empty");
    }

    let resized;
    let matte = if matte.dimensions() == (width, height) {
        matte
    } else {
        debug!(
            "Resizing {}x{} matte to {}x{}",
            matte.width(),
            matte.height(),
            width,
            height
        );
        resized = image::imageops::resize(matte, width, height, FilterType::Lanczos3);
        &resized
    };

    let mut data = input.clone().into_rgba().into_raw();
    for (px, alpha) in data.chunks_exact_mut(4).zip(matte.as_raw().iter()) {
        if let Some(a) = px.get_mut(3) {
            *a = *alpha;
        }
    }

    PixelBuffer::new(width, height, PixelFormat::Rgba8, data).context("assembling RGBA output")
}

impl<F> SegmentationModel for MatteModel<F>
where
    F: Fn(&PixelBuffer) -> anyhow::Result<GrayImage> + Send + Sync,
{
    fn segment(&self, input: &PixelBuffer) -> anyhow::Result<PixelBuffer> {
        let matte = (self.predict)(input).context("matte prediction failed")?;
        apply_matte(input, &matte)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
