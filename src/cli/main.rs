//! bg-erase command-line host
//!
//! Loads the input photo, segments it with a mask file or a chroma key,
//! composites it over a named background and writes the results.

use super::config::{format_from_path, CliConfigBuilder};
use crate::{
    assets::{AssetStore, DirectoryAssetStore, InMemoryAssetStore, DEFAULT_BACKGROUND_IDS},
    config::OutputFormat,
    processor::BackgroundEraser,
    services::{ImageIOService, OutputFormatHandler},
    tracing_config::{events, init_cli_tracing, spans, TracingFormat},
    types::RasterImage,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};
use tracing::{debug, info as trace_info};

/// Replace the background of a photo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bg-erase")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image
    #[arg(value_name = "INPUT", required_unless_present = "list_backgrounds")]
    pub input: Option<PathBuf>,

    /// Precomputed subject mask (white = subject)
    #[arg(long, value_name = "PATH", conflicts_with = "chroma_key")]
    pub mask: Option<PathBuf>,

    /// Segment by distance from a key colour, e.g. "#00ff00"
    #[arg(long, value_name = "HEX")]
    pub chroma_key: Option<String>,

    /// Key colour distance treated as background [default: 0.25]
    #[arg(long, requires = "chroma_key")]
    pub tolerance: Option<f32>,

    /// Width of the soft edge above the tolerance [default: 0.1]
    #[arg(long, requires = "chroma_key")]
    pub softness: Option<f32>,

    /// Background identifier [default: transparent_white]
    #[arg(short, long, value_name = "ID")]
    pub background: Option<String>,

    /// Directory of background images, identified by file stem
    #[arg(long, value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Mask blur sigma [default: 20]
    #[arg(long)]
    pub sigma_main: Option<f32>,

    /// Background blur sigma [default: 1]
    #[arg(long)]
    pub sigma_background: Option<f32>,

    /// Normalize the mask over its observed range
    #[arg(long)]
    pub auto_range: bool,

    /// Cutout threshold (0-1) [default: 0.5]
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Composite output file [default: <INPUT>_composite.<ext>]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output format (otherwise taken from the output extension)
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// JPEG quality (0-100) [default: 90]
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// Also write a hard-edged transparent cutout
    #[arg(long, value_name = "PATH")]
    pub cutout: Option<PathBuf>,

    /// Also write the photo with a grey background
    #[arg(long, value_name = "PATH")]
    pub gray: Option<PathBuf>,

    /// JSON configuration file; explicit flags override it
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// List available backgrounds and exit
    #[arg(long)]
    pub list_backgrounds: bool,

    /// Emit logs as JSON
    #[cfg(feature = "tracing-json")]
    #[arg(long)]
    pub json_logs: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
    Webp,
    Tiff,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose, log_format(&cli))
        .context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;

    if cli.list_backgrounds {
        return list_backgrounds(cli.assets.as_deref());
    }

    tokio::task::spawn_blocking(move || run(&cli, &session_id))
        .await
        .context("Processing task panicked")?
}

#[cfg(feature = "tracing-json")]
fn log_format(cli: &Cli) -> TracingFormat {
    if cli.json_logs {
        TracingFormat::Json
    } else {
        TracingFormat::Console
    }
}

#[cfg(not(feature = "tracing-json"))]
fn log_format(_cli: &Cli) -> TracingFormat {
    TracingFormat::Console
}

fn run(cli: &Cli, session_id: &str) -> Result<()> {
    let input = cli.input.as_deref().context("An input image is required")?;
    let config = CliConfigBuilder::from_cli(cli)?;
    let backend = CliConfigBuilder::backend(cli)?;

    let _session = spans::session(session_id, backend.name()).entered();
    info!("Input: {}", input.display());
    info!(
        "Background: {} (mask sigma {}, background sigma {})",
        config.blend.background_id, config.blend.sigma_main, config.blend.sigma_background
    );

    let image = {
        let _span = spans::file_processing(input, "load").entered();
        ImageIOService::load_image(input)
            .with_context(|| format!("Failed to load {}", input.display()))?
    };
    let store = open_store(cli.assets.as_deref(), &image)?;

    let output_format = config.output_format;
    let jpeg_quality = config.jpeg_quality;
    let mut eraser = BackgroundEraser::with_backend(config, backend)
        .context("Failed to create background eraser")?;

    let segmented = eraser.segment(&image).map_err(|e| {
        events::error_with_context(&e, "segmentation");
        e
    })?;
    let result = segmented
        .composite_default(store.as_ref())
        .context("Failed to composite")?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| generate_output_path(input, "composite", output_format));
    save(&result.image, &output, output_format, jpeg_quality)?;

    if let Some(path) = &cli.cutout {
        let cutout = match result.cutout.clone() {
            Some(cutout) => cutout,
            None => segmented.cutout().context("Failed to cut out subject")?,
        };
        let format = format_from_path(path).unwrap_or(OutputFormat::Png);
        OutputFormatHandler::validate_for_cutout(format);
        save(&cutout, path, format, jpeg_quality)?;
    }

    if let Some(path) = &cli.gray {
        let grey = segmented
            .desaturated()
            .context("Failed to desaturate background")?;
        let format = format_from_path(path).unwrap_or(output_format);
        save(&grey, path, format, jpeg_quality)?;
    }

    let timings = &result.metadata.timings;
    events::performance_metric("inference", timings.inference_ms);
    events::performance_metric("composite", timings.composite_ms);
    trace_info!(total_ms = timings.total_ms, "Finished");
    info!("{}", result.timing_summary());
    Ok(())
}

fn open_store(assets: Option<&Path>, image: &RasterImage) -> Result<Box<dyn AssetStore>> {
    match assets {
        Some(dir) => {
            let store = DirectoryAssetStore::open(dir)
                .with_context(|| format!("Failed to open asset directory {}", dir.display()))?;
            Ok(Box::new(store))
        },
        None => {
            debug!("No asset directory given, using built-in plain backgrounds");
            let store = InMemoryAssetStore::with_plain_backgrounds(image.width(), image.height())?;
            Ok(Box::new(store))
        },
    }
}

fn save(image: &RasterImage, path: &Path, format: OutputFormat, jpeg_quality: u8) -> Result<()> {
    let _span = spans::file_processing(path, "save").entered();
    ImageIOService::save_image(image, path, format, jpeg_quality)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn list_backgrounds(assets: Option<&Path>) -> Result<()> {
    match assets {
        Some(dir) => {
            let store = DirectoryAssetStore::open(dir)
                .with_context(|| format!("Failed to open asset directory {}", dir.display()))?;
            println!("Backgrounds in {}:", dir.display());
            for id in store.ids() {
                println!("  {}", id);
            }
        },
        None => {
            println!("Built-in backgrounds:");
            println!("  transparent_white");
            println!("  transparent_black");
            println!("Catalogue identifiers (provide files with --assets):");
            for id in DEFAULT_BACKGROUND_IDS {
                println!("  {}", id);
            }
        },
    }
    Ok(())
}

/// `<dir>/<stem>_<suffix>.<ext>` next to the input
fn generate_output_path(input_path: &Path, suffix: &str, format: OutputFormat) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_default();
    let dir = input_path.parent().unwrap_or(Path::new("."));

    dir.join(format!(
        "{}_{}.{}",
        stem.to_string_lossy(),
        suffix,
        OutputFormatHandler::get_extension(format)
    ))
}
