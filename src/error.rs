//! Error types for the compositing pipeline

use thiserror::Error;

/// Result type alias for compositing operations
pub type Result<T> = std::result::Result<T, CompositeError>;

/// Closed set of failure kinds a caller can discriminate on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Decode,
    Segmentation,
    DimensionMismatch,
    Encode,
    InvalidBuffer,
    InvalidConfig,
    Io,
    Timeout,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Decode => "decode",
            Self::Segmentation => "segmentation",
            Self::DimensionMismatch => "dimension-mismatch",
            Self::Encode => "encode",
            Self::InvalidBuffer => "invalid-buffer",
            Self::InvalidConfig => "invalid-config",
            Self::Io => "io",
            Self::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Error types for background removal and compositing
#[derive(Error, Debug)]
pub enum CompositeError {
    /// Input bytes are not a supported raster format, or are truncated/corrupt
    #[error("Decode error: {0}")]
    Decode(String),

    /// The segmentation model failed or broke its output contract
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Foreground and background sizes disagree at blend time
    #[error(
        "Dimension mismatch: foreground is {}x{}, background is {}x{}",
        foreground.0, foreground.1, background.0, background.1
    )]
    DimensionMismatch {
        foreground: (u32, u32),
        background: (u32, u32),
    },

    /// Serialising the final raster failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// Pixel data that breaks the buffer invariants
    #[error("Invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller-level deadline expired before the pipeline finished
    #[error("Processing timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl CompositeError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new segmentation error
    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::Segmentation(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new invalid buffer error
    pub fn invalid_buffer<S: Into<String>>(msg: S) -> Self {
        Self::InvalidBuffer(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a dimension mismatch error from two `(width, height)` pairs
    #[must_use]
    pub fn dimension_mismatch(foreground: (u32, u32), background: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            foreground,
            background,
        }
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Create a file I/O error that names the operation and path
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        Self::Io(std::io::Error::new(
            error.kind(),
            format!(
                "Failed to {} '{}': {}",
                operation,
                path.as_ref().display(),
                error
            ),
        ))
    }

    /// The failure kind, for callers that branch on cause
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Decode(_) => FailureKind::Decode,
            Self::Segmentation(_) => FailureKind::Segmentation,
            Self::DimensionMismatch { .. } => FailureKind::DimensionMismatch,
            Self::Encode(_) => FailureKind::Encode,
            Self::InvalidBuffer(_) => FailureKind::InvalidBuffer,
            Self::InvalidConfig(_) => FailureKind::InvalidConfig,
            Self::Io(_) => FailureKind::Io,
            Self::Timeout(_) => FailureKind::Timeout,
        }
    }

    /// Generic message safe to show an end user
    ///
    /// Internal details stay in the `Display` output and the logs.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            FailureKind::Decode => {
                "The image could not be read. Please try again with a PNG, JPEG, WebP or BMP file."
            },
            FailureKind::Segmentation => {
                "Background removal failed for this image. Please try again with a different image."
            },
            FailureKind::Timeout => {
                "Processing took too long. Please try again with a smaller image."
            },
            FailureKind::InvalidConfig => {
                "The selected options are not valid. Please check your choices and try again."
            },
            FailureKind::DimensionMismatch
            | FailureKind::Encode
            | FailureKind::InvalidBuffer
            | FailureKind::Io => {
                "An error occurred while processing the image. Please try again with a different image."
            },
        }
    }
}

impl From<serde_json::Error> for CompositeError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidConfig(format!("Failed to parse configuration: {}", e))
    }
}
