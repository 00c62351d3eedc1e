#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # bgswap
//!
//! Background removal and re-compositing for single raster images.
//!
//! An uploaded image is decoded, passed to a pretrained segmentation model to
//! cut out its foreground, optionally composited onto a new background (a
//! palette colour or a second image) and packaged as a timestamped PNG.
//!
//! ## Features
//!
//! - **Pluggable segmentation**: any [`SegmentationModel`]; an external
//!   command such as `rembg` or a grey-scale matte predictor
//! - **Format Support**: PNG, JPEG, WebP and BMP input, always PNG output so
//!   transparency survives
//! - **Linear soft-edge blending** in integer arithmetic
//! - **Decoder limits** for untrusted uploads
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//! - **Async and Sync APIs**
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgswap::{
//!     backends::CommandModel, composite_from_bytes, BackgroundMode, PaletteColor, Pipeline,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let model = CommandModel::from_command_line("rembg i {input} {output}")?;
//! let pipeline = Pipeline::with_defaults(model);
//!
//! let upload = std::fs::read("portrait.jpg")?;
//! let background = BackgroundMode::Color(PaletteColor::White).into_spec(None)?;
//! let artifact = composite_from_bytes(&pipeline, upload, background)?;
//! artifact.write_to_dir("out")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP input support
//! - `tracing-json`: JSON log output for the CLI

pub mod artifact;
pub mod backends;
pub mod background;
#[cfg(feature = "cli")]
pub mod cli;
pub mod codec;
pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod remover;
pub mod synthesizer;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;

// Public API exports
pub use artifact::{ArtifactEmitter, DownloadArtifact};
pub use background::{BackgroundMode, BackgroundSpec};
pub use codec::SupportedFormat;
pub use color::{PaletteColor, Rgb};
pub use config::{DecodeLimits, PipelineConfig, PipelineConfigBuilder, ResampleFilter, ResizePolicy};
pub use error::{CompositeError, FailureKind, Result};
pub use pipeline::{
    LogProgressReporter, NoOpProgressReporter, Pipeline, PipelineState, ProcessingRequest,
    ProgressReporter, RecordingProgressReporter,
};
pub use remover::{BackgroundRemover, SegmentationModel, SerializedModel};
pub use synthesizer::BackgroundSynthesizer;
pub use types::{CompositeResult, ForegroundResult, MaskCoverage, PixelBuffer, PixelFormat, Size};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Process an upload held in memory
///
/// The artifact is named after the current local time.
pub fn composite_from_bytes<M: SegmentationModel>(
    pipeline: &Pipeline<M>,
    image_bytes: Vec<u8>,
    background: BackgroundSpec,
) -> Result<DownloadArtifact> {
    let request = ProcessingRequest::new(image_bytes, background);
    pipeline.run(request, &NoOpProgressReporter)
}

/// Process an upload from an async reader
///
/// The stream is read to the end, then the blocking pipeline runs on Tokio's
/// blocking pool. With `timeout` set, the caller gets
/// [`CompositeError::Timeout`] once it expires; the blocking work itself is
/// not interrupted and its result is dropped.
///
/// ```rust,no_run
/// use bgswap::{backends::CommandModel, composite_from_reader, BackgroundSpec, Pipeline};
/// use std::{sync::Arc, time::Duration};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let model = CommandModel::from_command_line("rembg i {input} {output}")?;
/// let pipeline = Arc::new(Pipeline::with_defaults(model));
/// let file = File::open("portrait.jpg").await?;
/// let artifact = composite_from_reader(
///     file,
///     pipeline,
///     BackgroundSpec::None,
///     Some(Duration::from_secs(60)),
/// )
/// .await?;
/// println!("{}", artifact.filename());
/// # Ok(())
/// # }
/// ```
pub async fn composite_from_reader<R, M>(
    mut reader: R,
    pipeline: Arc<Pipeline<M>>,
    background: BackgroundSpec,
    timeout: Option<Duration>,
) -> Result<DownloadArtifact>
where
    R: AsyncRead + Unpin,
    M: SegmentationModel + 'static,
{
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer).await?;

    let request = ProcessingRequest::new(buffer, background);
    let task = tokio::task::spawn_blocking(move || pipeline.run(request, &NoOpProgressReporter));

    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| CompositeError::Timeout(limit))?,
        None => task.await,
    };

    joined.map_err(|e| CompositeError::segmentation(format!("processing task aborted: {}", e)))?
}
