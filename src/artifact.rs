//! Packaging of the final image for download

use crate::{
    codec,
    error::{CompositeError, Result},
    types::PixelBuffer,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Timestamp layout used in artifact filenames, one-second resolution
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Label used for download links when the caller has no preference
pub const DEFAULT_LINK_LABEL: &str = "Download Processed Image";

/// Encoded PNG ready to hand to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadArtifact {
    bytes: Vec<u8>,
    filename: String,
}

impl DownloadArtifact {
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// PNG bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// `data:image/png;base64,...` URI for inline display
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.bytes))
    }

    /// HTML anchor that downloads the artifact under its filename
    #[must_use]
    pub fn download_link(&self, label: &str) -> String {
        format!(
            "<a href=\"data:application/octet-stream;base64,{}\" download=\"{}\">{}</a>",
            STANDARD.encode(&self.bytes),
            escape_html(&self.filename),
            escape_html(label)
        )
    }

    /// Write the PNG into `dir` under the artifact filename
    ///
    /// Returns the path written.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| CompositeError::file_io_error("create output directory", dir, &e))?;

        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)
            .map_err(|e| CompositeError::file_io_error("write artifact", &path, &e))?;

        info!("Saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Encodes final images and names them by request time
#[derive(Debug, Clone)]
pub struct ArtifactEmitter {
    prefix: String,
}

impl Default for ArtifactEmitter {
    fn default() -> Self {
        Self::new("processed_")
    }
}

impl ArtifactEmitter {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `<prefix><YYYYMMDD_HHMMSS>.png`
    #[must_use]
    pub fn filename_for(&self, timestamp: NaiveDateTime) -> String {
        format!("{}{}.png", self.prefix, timestamp.format(TIMESTAMP_FORMAT))
    }

    /// Encode `image` as PNG and attach its filename
    ///
    /// Packaging the same buffer with the same timestamp always yields the
    /// same bytes and name.
    ///
    /// # Errors
    /// - `Encode` when PNG serialisation fails
    #[instrument(skip(self, image), fields(size = %image.size()))]
    pub fn package(&self, image: &PixelBuffer, timestamp: NaiveDateTime) -> Result<DownloadArtifact> {
        let bytes = codec::encode(image)?;
        Ok(DownloadArtifact {
            bytes,
            filename: self.filename_for(timestamp),
        })
    }
}
