//! Background swap CLI tool
//!
//! Reads one image, removes its background through an external segmentation
//! command and writes the PNG artifact.

use super::config::CliConfigBuilder;
use crate::{composite_from_reader, pipeline::Pipeline, DownloadArtifact};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncRead;
use tracing::debug;

/// Default segmentation command, see <https://github.com/danielgatis/rembg>
pub const DEFAULT_MODEL_COMMAND: &str = "rembg i {input} {output}";

/// Remove an image background and optionally replace it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgswap")]
pub struct Cli {
    /// Input image (PNG, JPEG, WebP or BMP); use "-" for stdin
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Output directory, or "-" to write the PNG to stdout [default: current directory]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<String>,

    /// Replacement background [default: inferred from --color / --background-image, else none]
    #[arg(short, long, value_enum)]
    pub background: Option<CliBackground>,

    /// Background colour: palette name (white, black, gray, red, green, blue, yellow) or hex
    #[arg(short, long, value_name = "NAME|HEX")]
    pub color: Option<String>,

    /// Background image, resized to the input dimensions
    #[arg(long, value_name = "PATH")]
    pub background_image: Option<PathBuf>,

    /// How a background image is fitted [default: stretch, or the config file value]
    #[arg(long, value_enum)]
    pub resize: Option<CliResize>,

    /// Segmentation command; must contain {input} and {output}
    #[arg(long, value_name = "CMD", default_value = DEFAULT_MODEL_COMMAND)]
    pub model_command: String,

    /// JSON pipeline configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the result as a data URI instead of writing a file
    #[arg(long)]
    pub data_uri: bool,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliBackground {
    /// Keep the transparent cutout
    None,
    Color,
    Image,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliResize {
    Stretch,
    Cover,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    crate::tracing_config::init_cli_tracing(cli.verbose)
        .context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::pipeline_config(&cli).context("Failed to build configuration")?;
    let background = CliConfigBuilder::background_spec(&cli)?;
    let model = CliConfigBuilder::model(&cli)?;

    info!("Input: {}", cli.input);
    info!("Segmentation command: {}", cli.model_command);
    debug!("Pipeline config: {:?}", config);

    let pipeline = Arc::new(Pipeline::new(model, config).context("Invalid configuration")?);
    let reader = open_input(&cli.input).await?;
    let timeout = cli.timeout.map(std::time::Duration::from_secs);

    let start = Instant::now();
    let artifact = composite_from_reader(reader, pipeline, background, timeout)
        .await
        .map_err(|e| {
            error!("{} ({})", e, e.kind());
            anyhow::anyhow!(e.user_message())
        })?;
    info!(
        "Processed {} in {:.2}s",
        cli.input,
        start.elapsed().as_secs_f64()
    );

    deliver(&cli, &artifact)
}

async fn open_input(input: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if input == "-" {
        info!("Reading image from stdin");
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open input file: {}", input))?;
    Ok(Box::new(file))
}

fn deliver(cli: &Cli, artifact: &DownloadArtifact) -> Result<()> {
    if cli.data_uri {
        println!("{}", artifact.data_uri());
        return Ok(());
    }

    match cli.output.as_deref() {
        Some("-") => write_stdout(artifact.bytes()),
        dir => {
            let dir = PathBuf::from(dir.unwrap_or("."));
            let path = artifact
                .write_to_dir(&dir)
                .with_context(|| format!("Failed to save result in {}", dir.display()))?;
            println!("{}", path.display());
            Ok(())
        },
    }
}

fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}
