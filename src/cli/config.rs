//! Conversion of CLI arguments into library configuration

use crate::cli::main_impl::{Cli, CliOutputFormat};
use crate::{
    backends::{ChromaKeyBackend, KeyColor, MaskImageBackend},
    config::{OutputFormat, ProcessorConfig},
    inference::SegmentationBackend,
    services::OutputFormatHandler,
};
use anyhow::{Context, Result};
use std::path::Path;

/// Builds a `ProcessorConfig` and backend from parsed arguments
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Start from `--config` (or defaults) and overlay explicit flags
    pub(crate) fn from_cli(cli: &Cli) -> Result<ProcessorConfig> {
        let mut config = match &cli.config {
            Some(path) => ProcessorConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?,
            None => ProcessorConfig::default(),
        };

        if let Some(background) = &cli.background {
            config.blend.background_id.clone_from(background);
        }
        if let Some(sigma) = cli.sigma_main {
            config.blend.sigma_main = sigma;
        }
        if let Some(sigma) = cli.sigma_background {
            config.blend.sigma_background = sigma;
        }
        if cli.auto_range {
            config.auto_range = true;
        }
        if let Some(threshold) = cli.threshold {
            config.cutout_threshold = threshold;
        }
        if let Some(quality) = cli.jpeg_quality {
            config.jpeg_quality = quality;
        }
        config.output_format = Self::output_format(cli, config.output_format);
        config.produce_cutout = cli.cutout.is_some();

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Construct the backend selected by `--mask` or `--chroma-key`
    pub(crate) fn backend(cli: &Cli) -> Result<Box<dyn SegmentationBackend>> {
        if let Some(mask) = &cli.mask {
            return Ok(Box::new(MaskImageBackend::from_path(mask)));
        }

        if let Some(hex) = &cli.chroma_key {
            let key: KeyColor = hex.parse().context("Invalid chroma key colour")?;
            let backend = ChromaKeyBackend::new(
                key,
                cli.tolerance.unwrap_or(ChromaKeyBackend::DEFAULT_TOLERANCE),
                cli.softness.unwrap_or(ChromaKeyBackend::DEFAULT_SOFTNESS),
            )
            .context("Invalid chroma key settings")?;
            return Ok(Box::new(backend));
        }

        anyhow::bail!("Either --mask or --chroma-key is required")
    }

    /// Check argument combinations clap cannot express
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.list_backgrounds {
            return Ok(());
        }
        if cli.input.is_none() {
            anyhow::bail!("An input image is required");
        }
        if cli.mask.is_none() && cli.chroma_key.is_none() {
            anyhow::bail!("Either --mask or --chroma-key is required");
        }
        if let Some(hex) = &cli.chroma_key {
            hex.parse::<KeyColor>().context("Invalid chroma key colour")?;
        }
        Ok(())
    }

    /// Explicit `--format`, then the output extension, then `fallback`
    pub(crate) fn output_format(cli: &Cli, fallback: OutputFormat) -> OutputFormat {
        if let Some(format) = cli.format {
            return format.into();
        }
        cli.output
            .as_deref()
            .and_then(format_from_path)
            .unwrap_or(fallback)
    }
}

/// Output format implied by a file extension
pub(crate) fn format_from_path(path: &Path) -> Option<OutputFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(OutputFormatHandler::from_extension)
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => Self::Png,
            CliOutputFormat::Jpeg => Self::Jpeg,
            CliOutputFormat::Webp => Self::WebP,
            CliOutputFormat::Tiff => Self::Tiff,
        }
    }
}
