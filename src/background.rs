//! User background selection and the resolved background spec

use crate::{
    color::{PaletteColor, Rgb},
    error::{CompositeError, Result},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What the user picked in the background selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "color", rename_all = "lowercase")]
pub enum BackgroundMode {
    /// Keep the transparent cutout
    #[default]
    None,
    /// Fill with a palette colour
    Color(PaletteColor),
    /// Use a second uploaded image
    Image,
}

impl BackgroundMode {
    /// Resolve the selection against the optional background upload
    ///
    /// Background bytes are required for [`BackgroundMode::Image`] and ignored
    /// otherwise.
    pub fn into_spec(self, background_bytes: Option<Vec<u8>>) -> Result<BackgroundSpec> {
        match (self, background_bytes) {
            (Self::None, _) => Ok(BackgroundSpec::None),
            (Self::Color(color), _) => Ok(BackgroundSpec::SolidColor(color.rgb())),
            (Self::Image, Some(bytes)) => Ok(BackgroundSpec::ImageFile(bytes)),
            (Self::Image, None) => Err(CompositeError::invalid_config(
                "Background mode 'image' requires a background image upload",
            )),
        }
    }
}

impl FromStr for BackgroundMode {
    type Err = CompositeError;

    /// Parses `none`, `image`, or `color:<palette name>`
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "none" | "transparent" => Ok(Self::None),
            "image" => Ok(Self::Image),
            other => match other.split_once(':') {
                Some(("color", name)) => Ok(Self::Color(name.parse()?)),
                _ => Err(CompositeError::invalid_config(format!(
                    "Unknown background mode {:?} (expected none, image or color:<name>)",
                    s
                ))),
            },
        }
    }
}

/// Replacement background to synthesise for one request
#[derive(Clone, PartialEq, Eq)]
pub enum BackgroundSpec {
    /// No replacement; the transparent foreground is the final image
    None,
    /// Uniform fill
    SolidColor(Rgb),
    /// Encoded image bytes, resized to the foreground
    ImageFile(Vec<u8>),
}

impl BackgroundSpec {
    /// Whether compositing will run for this spec
    #[must_use]
    pub fn replaces_background(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Debug for BackgroundSpec {
    // Raw image bytes would flood the logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::SolidColor(rgb) => write!(f, "SolidColor({})", rgb),
            Self::ImageFile(bytes) => write!(f, "ImageFile({} bytes)", bytes.len()),
        }
    }
}
