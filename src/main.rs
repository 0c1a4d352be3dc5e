//! Command-line front end: recognise regions of one image headlessly

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ocr_annotator::app::{Annotator, InputOutcome};
use ocr_annotator::config::{self, AppConfig};
use ocr_annotator::geometry::{Point, Rect};
use ocr_annotator::input::{DrawingTool, InputEvent};
use ocr_annotator::recognition::{HttpRecognitionClient, RecognitionService};
use ocr_annotator::storage;

/// OCR Annotator - recognise and annotate text regions in an image
#[derive(Parser, Debug)]
#[command(name = "ocr-annotator")]
#[command(about = "Recognise text in regions of an image and annotate it")]
struct Args {
    /// Image to annotate
    #[arg(short, long, required_unless_present = "open")]
    image: Option<PathBuf>,

    /// Saved document to continue instead of a fresh image
    #[arg(long, conflicts_with = "image")]
    open: Option<PathBuf>,

    /// Region to recognise in surface coordinates, as x,y,width,height
    #[arg(short, long = "region", value_parser = parse_region)]
    regions: Vec<Rect>,

    /// Translate recognised text
    #[arg(long)]
    translate: bool,

    /// Target language for translation
    #[arg(long)]
    lang: Option<String>,

    /// Recognition service base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write detections as JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render the image with detection boxes to this PNG
    #[arg(long)]
    render: Option<PathBuf>,

    /// Read order for the detections as comma-separated labels, e.g. 2,0,1.
    /// Labels left out keep their relative order after the listed ones.
    #[arg(long, value_parser = parse_read_order)]
    read_order: Option<::std::vec::Vec<usize>>,

    /// Save the annotation document (defaults to the data directory)
    #[arg(long, num_args = 0..=1)]
    save_document: Option<Option<PathBuf>>,
}

fn parse_region(value: &str) -> Result<Rect, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid region {:?}: {}", value, e))?;

    match parts.as_slice() {
        [x, y, w, h] if *w >= 0.0 && *h >= 0.0 => Ok(Rect::new(*x, *y, *w, *h)),
        [_, _, _, _] => Err(format!("region {:?} has a negative size", value)),
        _ => Err(format!("region {:?} must be x,y,width,height", value)),
    }
}

fn parse_read_order(value: &str) -> Result<Vec<usize>, String> {
    value
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid read order {:?}: {}", value, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => load_or_create_config(),
    };
    if let Some(endpoint) = &args.endpoint {
        config.recognition.endpoint = endpoint.clone();
    }
    if args.translate {
        config.recognition.translate = true;
    }
    if let Some(lang) = &args.lang {
        config.recognition.target_language = lang.clone();
    }

    let client = HttpRecognitionClient::new(&config.recognition)?;
    let mut annotator = Annotator::new(config);

    if let Some(path) = &args.open {
        annotator.restore(storage::load_document(path)?);
    } else if let Some(path) = &args.image {
        let raster = image::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?
            .to_rgba8();
        annotator.load_image(raster);
    }

    recognize_regions(&mut annotator, &client, &args.regions).await?;

    if let Some(labels) = &args.read_order {
        annotator.reorder(labels);
        info!("Applied read order {:?}", labels);
    }

    let detections = serde_json::to_string_pretty(annotator.results().as_slice())?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, detections)?;
            info!("Wrote {} detections to {:?}", annotator.results().len(), path);
        }
        None => println!("{}", detections),
    }

    if let Some(path) = &args.render {
        match annotator.render_annotated() {
            Some(rendered) => {
                rendered
                    .save(path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Rendered annotated image to {:?}", path);
            }
            None => warn!("No image loaded, nothing to render"),
        }
    }

    if let Some(target) = &args.save_document {
        let path = match target {
            Some(path) => path.clone(),
            None => storage::get_data_dir()?.join("last-document.json"),
        };
        save_document(&annotator, &path)?;
    }

    Ok(())
}

/// Drive each region through the same pointer path as interactive use
async fn recognize_regions(annotator: &mut Annotator, service: &dyn RecognitionService, regions: &[Rect]) -> Result<()> {
    annotator.set_tool(DrawingTool::Ocr);

    for (i, region) in regions.iter().enumerate() {
        let viewport = annotator.surface().viewport;
        let start = viewport.surface_to_screen(region.origin());
        let end = viewport.surface_to_screen(Point::new(region.right(), region.bottom()));

        annotator.handle_input(InputEvent::PointerDown { at: start, alt: false })?;
        annotator.handle_input(InputEvent::PointerMove { at: end })?;
        let job = match annotator.handle_input(InputEvent::PointerUp { at: end })? {
            InputOutcome::Recognize(job) => job,
            _ => {
                warn!("Region {} has nothing to recognise", i + 1);
                continue;
            }
        };

        match annotator.recognize_with(service, job).await {
            Ok(outcome) => info!("Region {}: {:?}", i + 1, outcome),
            Err(e) => error!("Region {} failed: {}", i + 1, e),
        }
    }

    Ok(())
}

/// Load configuration from file or create default
fn load_or_create_config() -> AppConfig {
    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            match config::load_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", config_path);
                    return config;
                }
                Err(e) => warn!("Ignoring invalid configuration: {:#}", e),
            }
        } else if let Err(e) = config::save_config(&AppConfig::default(), &config_path) {
            warn!("Could not write default configuration: {:#}", e);
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

fn save_document(annotator: &Annotator, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    storage::save_document(&annotator.snapshot(), path)?;
    info!("Saved document to {:?}", path);
    Ok(())
}
