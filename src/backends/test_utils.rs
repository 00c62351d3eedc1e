//! Test doubles for the segmentation model
//!
//! These models implement [`SegmentationModel`] deterministically so pipelines
//! can be exercised without a real network or external program. Each model
//! records how many times it was invoked.

use crate::{
    remover::SegmentationModel,
    types::{PixelBuffer, PixelFormat},
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Keeps every pixel: returns the input as RGBA with alpha 255
#[derive(Debug, Default)]
pub struct FullForegroundModel {
    calls: AtomicUsize,
}

impl FullForegroundModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SegmentationModel for FullForegroundModel {
    fn segment(&self, input: &PixelBuffer) -> anyhow::Result<PixelBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(input.clone().into_rgba())
    }

    fn name(&self) -> &str {
        "full-foreground"
    }
}

/// Removes a square block in the top-left corner
///
/// Pixels with `x < block && y < block` get alpha 0. With an edge alpha set,
/// the one-pixel ring just outside the block gets that alpha instead of 255.
#[derive(Debug)]
pub struct CornerCutoutModel {
    block: u32,
    edge_alpha: Option<u8>,
    calls: AtomicUsize,
}

impl CornerCutoutModel {
    #[must_use]
    pub fn new(block: u32) -> Self {
        Self {
            block,
            edge_alpha: None,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_edge(block: u32, edge_alpha: u8) -> Self {
        Self {
            edge_alpha: Some(edge_alpha),
            ..Self::new(block)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x < self.block && y < self.block {
            return 0;
        }
        match self.edge_alpha {
            Some(edge) if x <= self.block && y <= self.block => edge,
            _ => u8::MAX,
        }
    }
}

impl SegmentationModel for CornerCutoutModel {
    fn segment(&self, input: &PixelBuffer) -> anyhow::Result<PixelBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rgba = input.clone().into_rgba();
        let width = rgba.width();
        let mut data = rgba.into_raw();
        for (i, px) in data.chunks_exact_mut(4).enumerate() {
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            if let Some(alpha) = px.get_mut(3) {
                *alpha = self.alpha_at(x, y);
            }
        }
        PixelBuffer::new(input.width(), input.height(), PixelFormat::Rgba8, data)
            .map_err(anyhow::Error::from)
    }

    fn name(&self) -> &str {
        "corner-cutout"
    }
}

/// Always fails with the given message
#[derive(Debug)]
pub struct FailingModel {
    message: String,
    calls: AtomicUsize,
}

impl FailingModel {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SegmentationModel for FailingModel {
    fn segment(&self, _input: &PixelBuffer) -> anyhow::Result<PixelBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("{}", self.message)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Ways a [`MalformedModel`] breaks the output contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformation {
    /// Output is one pixel wider than the input
    WrongSize,
    /// Output has no alpha channel
    NoAlpha,
}

/// Returns output that violates the segmentation contract
#[derive(Debug)]
pub struct MalformedModel {
    malformation: Malformation,
    calls: AtomicUsize,
}

impl MalformedModel {
    #[must_use]
    pub fn new(malformation: Malformation) -> Self {
        Self {
            malformation,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SegmentationModel for MalformedModel {
    fn segment(&self, input: &PixelBuffer) -> anyhow::Result<PixelBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (width, height) = input.dimensions();
        let output = match self.malformation {
            Malformation::WrongSize => PixelBuffer::new(
                width + 1,
                height,
                PixelFormat::Rgba8,
                vec![255; (width as usize + 1) * height as usize * 4],
            )?,
            Malformation::NoAlpha => PixelBuffer::new(
                width,
                height,
                PixelFormat::Rgb8,
                vec![0; width as usize * height as usize * 3],
            )?,
        };
        Ok(output)
    }

    fn name(&self) -> &str {
        "malformed"
    }
}
