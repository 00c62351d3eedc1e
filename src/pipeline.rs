//! Request pipeline: decode, segment, composite, package
//!
//! A [`Pipeline`] owns the segmentation adapter and configuration and is safe to
//! share between requests. Each [`Pipeline::run`] call walks one request through
//! the state machine
//!
//! ```text
//! Idle -> Decoded -> Segmented -> Composited             -> Packaged
//!                              \-> PassthroughTransparent -/
//! ```
//!
//! and stops in `Failed` on the first error. Nothing is retried.

use crate::{
    artifact::{ArtifactEmitter, DownloadArtifact},
    background::BackgroundSpec,
    codec, compositor,
    config::PipelineConfig,
    error::{CompositeError, FailureKind, Result},
    remover::{BackgroundRemover, SegmentationModel},
    synthesizer::BackgroundSynthesizer,
};
use chrono::NaiveDateTime;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{info, instrument};

/// Where a request is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Decoded,
    Segmented,
    /// Blended onto a replacement background
    Composited,
    /// No replacement requested; the cutout keeps its transparency
    PassthroughTransparent,
    Packaged,
    Failed(FailureKind),
}

impl PipelineState {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Waiting for input",
            Self::Decoded => "Decoded input image",
            Self::Segmented => "Removed background",
            Self::Composited => "Composited onto new background",
            Self::PassthroughTransparent => "Kept transparent background",
            Self::Packaged => "Packaged PNG artifact",
            Self::Failed(_) => "Processing failed",
        }
    }

    /// Rough completion percentage for progress displays
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Decoded => 15,
            Self::Segmented => 75,
            Self::Composited | Self::PassthroughTransparent => 90,
            Self::Packaged => 100,
            Self::Failed(_) => 0,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Packaged | Self::Failed(_))
    }
}

/// Receives state transitions while a request runs
pub trait ProgressReporter: Send + Sync {
    /// Called after each successful transition
    fn report_state(&self, state: PipelineState, elapsed_ms: u64);

    /// Called once when the request fails, with the last state reached
    fn report_error(&self, last_state: PipelineState, error: &CompositeError);
}

/// Discards every update
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_state(&self, _state: PipelineState, _elapsed_ms: u64) {}

    fn report_error(&self, _last_state: PipelineState, _error: &CompositeError) {}
}

/// Logs each transition through the `log` facade
pub struct LogProgressReporter {
    verbose: bool,
}

impl LogProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for LogProgressReporter {
    fn report_state(&self, state: PipelineState, elapsed_ms: u64) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                state.progress_percentage(),
                state.description(),
                elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", state.progress_percentage(), state.description());
        }
    }

    fn report_error(&self, last_state: PipelineState, error: &CompositeError) {
        log::error!("Failed after '{}': {}", last_state.description(), error);
    }
}

/// Keeps every transition in memory, for tests and callers that want a trace
#[derive(Default)]
pub struct RecordingProgressReporter {
    states: Mutex<Vec<PipelineState>>,
}

impl RecordingProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// States seen so far, including a trailing `Failed` on error
    #[must_use]
    pub fn states(&self) -> Vec<PipelineState> {
        self.states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn push(&self, state: PipelineState) {
        self.states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(state);
    }
}

impl ProgressReporter for RecordingProgressReporter {
    fn report_state(&self, state: PipelineState, _elapsed_ms: u64) {
        self.push(state);
    }

    fn report_error(&self, _last_state: PipelineState, error: &CompositeError) {
        self.push(PipelineState::Failed(error.kind()));
    }
}

/// One user request
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub image_bytes: Vec<u8>,
    pub background: BackgroundSpec,
    /// Drives the artifact filename
    pub request_time: NaiveDateTime,
}

impl ProcessingRequest {
    /// Request stamped with the current local time
    #[must_use]
    pub fn new(image_bytes: Vec<u8>, background: BackgroundSpec) -> Self {
        Self::at(image_bytes, background, chrono::Local::now().naive_local())
    }

    #[must_use]
    pub fn at(image_bytes: Vec<u8>, background: BackgroundSpec, request_time: NaiveDateTime) -> Self {
        Self {
            image_bytes,
            background,
            request_time,
        }
    }
}

/// Shared, stateless request processor
pub struct Pipeline<M> {
    remover: BackgroundRemover<M>,
    synthesizer: BackgroundSynthesizer,
    emitter: ArtifactEmitter,
    config: PipelineConfig,
}

impl<M: SegmentationModel> Pipeline<M> {
    /// Build a pipeline around `model`
    ///
    /// # Errors
    /// - `InvalidConfig` when `config` does not validate
    pub fn new(model: M, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            remover: BackgroundRemover::new(model),
            synthesizer: BackgroundSynthesizer::from_config(&config),
            emitter: ArtifactEmitter::new(config.filename_prefix.clone()),
            config,
        })
    }

    /// Pipeline with the default configuration
    pub fn with_defaults(model: M) -> Self {
        Self {
            remover: BackgroundRemover::new(model),
            synthesizer: BackgroundSynthesizer::default(),
            emitter: ArtifactEmitter::default(),
            config: PipelineConfig::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn model(&self) -> &M {
        self.remover.model()
    }

    /// Process one request to a downloadable artifact
    ///
    /// The reporter sees every transition, and the error with the last state
    /// reached when a stage fails.
    ///
    /// # Errors
    /// The first stage error, unchanged. Decode failures stop the request
    /// before the model is called.
    #[instrument(skip_all, fields(input_len = request.image_bytes.len(), background = ?request.background))]
    pub fn run(
        &self,
        request: ProcessingRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<DownloadArtifact> {
        let start = Instant::now();
        let mut state = PipelineState::Idle;

        let result = self.walk(request, &mut |next| {
            state = next;
            reporter.report_state(next, start.elapsed().as_millis() as u64);
        });

        match &result {
            Ok(artifact) => info!(
                "Produced {} in {}ms",
                artifact.filename(),
                start.elapsed().as_millis()
            ),
            Err(e) => reporter.report_error(state, e),
        }
        result
    }

    fn walk(
        &self,
        request: ProcessingRequest,
        advance: &mut dyn FnMut(PipelineState),
    ) -> Result<DownloadArtifact> {
        let ProcessingRequest {
            image_bytes,
            background,
            request_time,
        } = request;

        let decoded = codec::decode_with_limits(&image_bytes, &self.config.decode_limits)?;
        drop(image_bytes);
        advance(PipelineState::Decoded);

        let foreground = self.remover.process(decoded)?;
        advance(PipelineState::Segmented);

        let size = foreground.size();
        let final_image = match self.synthesizer.create(background, size)? {
            Some(bg) => {
                let composite = compositor::blend(foreground, &bg)?;
                advance(PipelineState::Composited);
                composite.into_buffer()
            },
            None => {
                let cutout = compositor::passthrough(foreground);
                advance(PipelineState::PassthroughTransparent);
                cutout
            },
        };

        let artifact = self.emitter.package(&final_image, request_time)?;
        advance(PipelineState::Packaged);
        Ok(artifact)
    }
}
