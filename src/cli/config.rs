//! Conversion of CLI arguments into pipeline inputs

use crate::backends::CommandModel;
use crate::cli::main_impl::{Cli, CliBackground, CliResize};
use crate::{
    background::BackgroundSpec,
    color::{PaletteColor, Rgb},
    config::{PipelineConfig, ResizePolicy},
};
use anyhow::{bail, Context, Result};

/// Builds pipeline configuration from parsed arguments
pub struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Effective background choice after inference from the other flags
    #[must_use]
    pub fn background_mode(cli: &Cli) -> CliBackground {
        cli.background.unwrap_or(if cli.background_image.is_some() {
            CliBackground::Image
        } else if cli.color.is_some() {
            CliBackground::Color
        } else {
            CliBackground::None
        })
    }

    /// Load the config file when given, then apply flag overrides
    pub fn pipeline_config(cli: &Cli) -> Result<PipelineConfig> {
        let mut config = match &cli.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(resize) = cli.resize {
            config.resize_policy = match resize {
                CliResize::Stretch => ResizePolicy::Stretch,
                CliResize::Cover => ResizePolicy::Cover,
            };
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Parse a palette name first, then a hex value
    pub fn parse_color(value: &str) -> Result<Rgb> {
        if let Ok(named) = value.parse::<PaletteColor>() {
            return Ok(named.rgb());
        }
        Rgb::parse_hex(value).with_context(|| {
            format!(
                "'{}' is neither a palette colour ({}) nor a hex value",
                value,
                PaletteColor::ALL.map(PaletteColor::name).join(", ")
            )
        })
    }

    /// Resolve the background flags, reading the background image if needed
    pub fn background_spec(cli: &Cli) -> Result<BackgroundSpec> {
        match Self::background_mode(cli) {
            CliBackground::None => Ok(BackgroundSpec::None),
            CliBackground::Color => {
                let color = cli
                    .color
                    .as_deref()
                    .map_or(Ok(Rgb::WHITE), Self::parse_color)?;
                Ok(BackgroundSpec::SolidColor(color))
            },
            CliBackground::Image => {
                let Some(path) = &cli.background_image else {
                    bail!("--background image requires --background-image");
                };
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read background image {}", path.display()))?;
                Ok(BackgroundSpec::ImageFile(bytes))
            },
        }
    }

    pub fn model(cli: &Cli) -> Result<CommandModel> {
        CommandModel::from_command_line(&cli.model_command).context("Invalid --model-command")
    }

    /// Check flag combinations that clap cannot express
    pub fn validate_cli(cli: &Cli) -> Result<()> {
        let mode = Self::background_mode(cli);

        if mode == CliBackground::Image && cli.background_image.is_none() {
            bail!("--background image requires --background-image");
        }
        if mode != CliBackground::Image && cli.background_image.is_some() {
            bail!("--background-image is only used with --background image");
        }
        if mode != CliBackground::Color && cli.color.is_some() {
            bail!("--color is only used with --background color");
        }
        if let Some(color) = &cli.color {
            Self::parse_color(color)?;
        }
        if cli.timeout == Some(0) {
            bail!("--timeout must be at least 1 second");
        }
        if cli.data_uri && cli.output.is_some() {
            bail!("--data-uri and --output cannot be combined");
        }
        Self::model(cli)?;

        Ok(())
    }
}
