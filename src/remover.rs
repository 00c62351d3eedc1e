//! Background removal through an external segmentation model

use crate::{
    error::{CompositeError, Result},
    types::{ForegroundResult, PixelBuffer, PixelFormat},
};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Opaque segmentation model
///
/// Implementations receive a decoded image and must return the same image with
/// the background made transparent: identical width and height, RGBA8 layout.
/// One model instance may be shared by concurrent requests, so `segment` takes
/// `&self`. Wrap non-reentrant models in [`SerializedModel`].
pub trait SegmentationModel: Send + Sync {
    /// Isolate the foreground of `input`
    ///
    /// # Errors
    /// Any model failure; the remover reports it as a segmentation error.
    fn segment(&self, input: &PixelBuffer) -> anyhow::Result<PixelBuffer>;

    /// Human-readable model name for logs
    fn name(&self) -> &str {
        "segmentation-model"
    }
}

impl<M: SegmentationModel + ?Sized> SegmentationModel for Arc<M> {
    fn segment(&self, input: &PixelBuffer) -> anyhow::Result<PixelBuffer> {
        (**self).segment(input)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<M: SegmentationModel + ?Sized> SegmentationModel for Box<M> {
    fn segment(&self, input: &PixelBuffer) -> anyhow::Result<PixelBuffer> {
        (**self).segment(input)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Serialises calls into a model that is not safe for concurrent use
pub struct SerializedModel<M> {
    inner: Mutex<M>,
    name: String,
}

impl<M> SerializedModel<M> {
    pub fn new<S: Into<String>>(model: M, name: S) -> Self {
        Self {
            inner: Mutex::new(model),
            name: name.into(),
        }
    }
}

impl<M> SegmentationModel for SerializedModel<M>
where
    M: FnMut(&PixelBuffer) -> anyhow::Result<PixelBuffer> + Send,
{
    fn segment(&self, input: &PixelBuffer) -> anyhow::Result<PixelBuffer> {
        // A panic in an earlier call leaves the model itself usable
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let model = &mut *guard;
        model(input)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Adapter that runs the model and enforces its output contract
pub struct BackgroundRemover<M> {
    model: M,
}

impl<M: SegmentationModel> BackgroundRemover<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Remove the background from `buffer`
    ///
    /// # Errors
    /// - `Segmentation` when the model fails, or returns a buffer with different
    ///   dimensions or without an alpha channel
    #[instrument(skip(self, buffer), fields(model = %self.model.name(), width = buffer.width(), height = buffer.height()))]
    pub fn process(&self, buffer: PixelBuffer) -> Result<ForegroundResult> {
        let start = Instant::now();
        let input_dims = buffer.dimensions();

        let output = self.model.segment(&buffer).map_err(|e| {
            warn!("Segmentation model '{}' failed: {:#}", self.model.name(), e);
            CompositeError::segmentation(format!(
                "Model '{}' failed: {:#}",
                self.model.name(),
                e
            ))
        })?;

        if output.dimensions() != input_dims {
            return Err(CompositeError::segmentation(format!(
                "Model '{}' returned {}x{} output for {}x{} input",
                self.model.name(),
                output.width(),
                output.height(),
                input_dims.0,
                input_dims.1
            )));
        }

        if output.format() != PixelFormat::Rgba8 {
            return Err(CompositeError::segmentation(format!(
                "Model '{}' returned {} output with {} channels; expected RGBA8",
                self.model.name(),
                output.format(),
                output.format().channels()
            )));
        }

        let foreground = ForegroundResult::new(output)
            .map_err(|e| CompositeError::segmentation(e.to_string()))?;

        let coverage = foreground.coverage();
        info!(
            "Segmentation finished in {}ms, {:.1}% foreground",
            start.elapsed().as_millis(),
            coverage.foreground_ratio() * 100.0
        );
        debug!("Mask coverage: {:?}", coverage);

        Ok(foreground)
    }
}
