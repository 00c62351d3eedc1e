//! Configuration types for the compositing pipeline

use crate::error::{CompositeError, Result};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a background image is fitted to the foreground size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizePolicy {
    /// Scale each axis independently to the exact target size (aspect ratio not kept)
    #[default]
    Stretch,
    /// Centre-crop to the target aspect ratio, then scale to the target size
    Cover,
}

/// Smooth resampling filters for background resizing
///
/// Nearest-neighbour is deliberately absent: it aliases visibly along the
/// composite boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    /// Bilinear
    Triangle,
    /// Bicubic
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Guards applied while decoding untrusted uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    /// Maximum accepted width in pixels
    pub max_width: u32,
    /// Maximum accepted height in pixels
    pub max_height: u32,
    /// Maximum decoder allocation in bytes
    pub max_alloc_bytes: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_width: 16_384,
            max_height: 16_384,
            // 16k x 16k RGBA8
            max_alloc_bytes: 1024 * 1024 * 1024,
        }
    }
}

impl DecodeLimits {
    /// Convert to the `image` crate's decoder limits
    #[must_use]
    pub fn to_image_limits(&self) -> image::Limits {
        let mut limits = image::Limits::default();
        limits.max_image_width = Some(self.max_width);
        limits.max_image_height = Some(self.max_height);
        limits.max_alloc = Some(self.max_alloc_bytes);
        limits
    }
}

/// Configuration for one pipeline instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Prefix of generated artifact filenames
    pub filename_prefix: String,

    /// How background images are fitted to the foreground
    pub resize_policy: ResizePolicy,

    /// Filter used when resizing background images
    pub resample_filter: ResampleFilter,

    /// Decoder limits for uploaded images
    pub decode_limits: DecodeLimits,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filename_prefix: "processed_".to_string(),
            resize_policy: ResizePolicy::default(),
            resample_filter: ResampleFilter::default(),
            decode_limits: DecodeLimits::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CompositeError::file_io_error("read config file", path, &e))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.filename_prefix.is_empty() {
            return Err(CompositeError::invalid_config(
                "filename_prefix must not be empty",
            ));
        }
        if self
            .filename_prefix
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control())
        {
            return Err(CompositeError::invalid_config(format!(
                "filename_prefix {:?} contains path separators or control characters",
                self.filename_prefix
            )));
        }
        if self.decode_limits.max_width == 0 {
            return Err(CompositeError::config_value_error(
                "max_width",
                self.decode_limits.max_width,
                "1-4294967295",
            ));
        }
        if self.decode_limits.max_height == 0 {
            return Err(CompositeError::config_value_error(
                "max_height",
                self.decode_limits.max_height,
                "1-4294967295",
            ));
        }
        if self.decode_limits.max_alloc_bytes == 0 {
            return Err(CompositeError::config_value_error(
                "max_alloc_bytes",
                self.decode_limits.max_alloc_bytes,
                "> 0",
            ));
        }
        Ok(())
    }
}

/// Builder for `PipelineConfig`
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    #[must_use]
    pub fn filename_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.filename_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn resize_policy(mut self, policy: ResizePolicy) -> Self {
        self.config.resize_policy = policy;
        self
    }

    #[must_use]
    pub fn resample_filter(mut self, filter: ResampleFilter) -> Self {
        self.config.resample_filter = filter;
        self
    }

    #[must_use]
    pub fn decode_limits(mut self, limits: DecodeLimits) -> Self {
        self.config.decode_limits = limits;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Empty or unsafe filename prefix
    /// - Zero decode limits
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.filename_prefix, "processed_");
        assert_eq!(config.resize_policy, ResizePolicy::Stretch);
        assert_eq!(config.resample_filter, ResampleFilter::Lanczos3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PipelineConfig::builder()
            .filename_prefix("cutout_")
            .resize_policy(ResizePolicy::Cover)
            .resample_filter(ResampleFilter::Triangle)
            .build()
            .unwrap();
        assert_eq!(config.filename_prefix, "cutout_");
        assert_eq!(config.resize_policy, ResizePolicy::Cover);
        assert_eq!(FilterType::from(config.resample_filter), FilterType::Triangle);
    }

    #[test]
    fn test_builder_rejects_bad_prefix() {
        assert!(PipelineConfig::builder().filename_prefix("").build().is_err());
        assert!(PipelineConfig::builder()
            .filename_prefix("../escape_")
            .build()
            .is_err());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let limits = DecodeLimits {
            max_width: 0,
            ..DecodeLimits::default()
        };
        let err = PipelineConfig::builder().decode_limits(limits).build().unwrap_err();
        assert!(err.to_string().contains("max_width"));
    }

    #[test]
    fn test_enum_defaults() {
        assert_eq!(ResizePolicy::default(), ResizePolicy::Stretch);
        assert_eq!(ResampleFilter::default(), ResampleFilter::Lanczos3);
        let config = PipelineConfig::default();
        assert_eq!(config.resize_policy, ResizePolicy::Stretch);
        assert_eq!(config.resample_filter, ResampleFilter::Lanczos3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PipelineConfig::from_json_str(r#"{"resize_policy": "cover"}"#).unwrap();
        assert_eq!(config.resize_policy, ResizePolicy::Cover);
        assert_eq!(config.filename_prefix, "processed_");
        assert_eq!(config.decode_limits, DecodeLimits::default());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = PipelineConfig::from_json_str(r#"{"resample_filter": "nearest"}"#).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::InvalidConfig);
    }

    #[test]
    fn test_json_file_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bgswap.json");
        std::fs::write(&path, r#"{"filename_prefix": "shot_"}"#).unwrap();
        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.filename_prefix, "shot_");

        let missing = PipelineConfig::from_json_file(dir.path().join("missing.json"));
        assert!(missing.is_err());
    }
}
