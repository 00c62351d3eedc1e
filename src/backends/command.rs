//! Segmentation through an external command-line tool
//!
//! The input is written as a PNG to a scratch directory, the command is run with
//! `{input}` and `{output}` substituted in its arguments, and the PNG it writes
//! is read back. This fits tools such as `rembg i {input} {output}`.

use crate::{codec, remover::SegmentationModel, types::PixelBuffer};
use anyhow::{anyhow, bail, Context};
use std::path::Path;
use std::process::Command;
use tracing::debug;

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Segmentation model backed by an external program
#[derive(Debug, Clone)]
pub struct CommandModel {
    program: String,
    args: Vec<String>,
}

impl CommandModel {
    /// Create a model from a program and argument template
    ///
    /// # Errors
    /// Fails unless the arguments mention both `{input}` and `{output}`.
    pub fn new<P, I, S>(program: P, args: I) -> anyhow::Result<Self>
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        if program.trim().is_empty() {
            bail!("segmentation command is empty");
        }
        for placeholder in [INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER] {
            if !args.iter().any(|a| a.contains(placeholder)) {
                bail!(
                    "segmentation command must reference {} in its arguments",
                    placeholder
                );
            }
        }

        Ok(Self { program, args })
    }

    /// Parse a whitespace-separated command line such as `rembg i {input} {output}`
    ///
    /// No shell quoting is interpreted.
    pub fn from_command_line(command_line: &str) -> anyhow::Result<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("segmentation command is empty"))?;
        Self::new(program, parts)
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn render_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }
}

impl SegmentationModel for CommandModel {
    fn segment(&self, input: &PixelBuffer) -> anyhow::Result<PixelBuffer> {
        let scratch = tempfile::Builder::new()
            .prefix("bgswap-")
            .tempdir()
            .context("creating scratch directory")?;
        let input_path = scratch.path().join("input.png");
        let output_path = scratch.path().join("output.png");

        std::fs::write(&input_path, codec::encode(input)?)
            .with_context(|| format!("writing {}", input_path.display()))?;

        let args = self.render_args(&input_path, &output_path);
        debug!("Running segmentation command: {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .with_context(|| format!("failed to start '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            );
        }

        let bytes = std::fs::read(&output_path)
            .with_context(|| format!("'{}' did not write {}", self.program, output_path.display()))?;

        codec::decode(&bytes).with_context(|| format!("'{}' wrote an unreadable image", self.program))
    }

    fn name(&self) -> &str {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PixelFormat, Size};

    #[test]
    fn test_requires_placeholders() {
        assert!(CommandModel::from_command_line("rembg i {input} {output}").is_ok());
        assert!(CommandModel::from_command_line("rembg i {input}").is_err());
        assert!(CommandModel::from_command_line("rembg i -o {output}").is_err());
        assert!(CommandModel::from_command_line("   ").is_err());
    }

    #[test]
    fn test_placeholders_substituted() {
        let model = CommandModel::new("tool", ["--in={input}", "{output}"]).unwrap();
        let args = model.render_args(Path::new("/tmp/a.png"), Path::new("/tmp/b.png"));
        assert_eq!(args, vec!["--in=/tmp/a.png".to_string(), "/tmp/b.png".to_string()]);
    }

    #[test]
    fn test_missing_program_fails() {
        let model = CommandModel::from_command_line("bgswap-no-such-tool-7f3a {input} {output}").unwrap();
        let input = PixelBuffer::filled(Size::new(2, 2).unwrap(), PixelFormat::Rgb8, &[0, 0, 0]).unwrap();
        let err = model.segment(&input).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to start"));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_command_round_trips() {
        // `cp` leaves the image untouched, so an RGBA input comes back as-is
        let model = CommandModel::from_command_line("cp {input} {output}").unwrap();
        let input = PixelBuffer::filled(Size::new(3, 2).unwrap(), PixelFormat::Rgba8, &[5, 6, 7, 128]).unwrap();
        let output = model.segment(&input).unwrap();
        assert_eq!(output, input);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_without_output_fails() {
        let model = CommandModel::new("true", ["{input}", "{output}"]).unwrap();
        let input = PixelBuffer::filled(Size::new(1, 1).unwrap(), PixelFormat::Rgb8, &[0, 0, 0]).unwrap();
        let err = model.segment(&input).unwrap_err();
        assert!(format!("{:#}", err).contains("did not write"));
    }
}
