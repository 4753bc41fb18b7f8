// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanlens command-line front end.
//
// Runs the live pipeline over the platform camera, or over a still image
// replayed as a camera feed, then optionally writes the rendered overlay and
// a captured scan.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use image::DynamicImage;
use scanlens_bridge::ReplayCamera;
use scanlens_bridge::traits::{CameraBridge, TextRecognizer};
use scanlens_core::config::PipelineConfig;
use scanlens_core::error::{Result, ScanlensError};
use scanlens_core::geometry::Size;
use scanlens_core::human_errors::humanize_error;
use scanlens_core::types::{CameraPosition, Mode};
use scanlens_pipeline::{Collaborators, DetectorSet, ImageSurface, Pipeline, ScanRepository, present};
use scanlens_vision::{HoughRectangleDetector, RxingBarcodeDetector};
use tracing::{error, info, warn};

use services::{config_store, data_dir};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Camera,
    Barcode,
    Document,
    FaceLandmarks,
    FacePitch,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Camera => Mode::Camera,
            ModeArg::Barcode => Mode::Barcode,
            ModeArg::Document => Mode::Document,
            ModeArg::FaceLandmarks => Mode::FaceLandmarks,
            ModeArg::FacePitch => Mode::FacePitch,
        }
    }
}

/// Run the Scanlens camera pipeline over the platform camera or a replayed
/// still image.
#[derive(Debug, Parser)]
#[command(name = "scanlens", version, about)]
struct Args {
    /// Image replayed as the camera feed and used as the captured photo.
    /// Without it the platform camera is opened.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Pipeline mode. Defaults to the saved configuration.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Number of frames to replay.
    #[arg(long, default_value_t = 10)]
    frames: usize,

    /// Write the captured scan image here.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the image with the final overlay drawn on it here.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Treat the feed as coming from the front (mirrored) camera.
    #[arg(long)]
    front: bool,

    /// Save the effective configuration as the new default.
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let human = humanize_error(&err);
            error!(error = %err, "{}", human.message);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let dir = data_dir::data_dir();
    let mut config = config_store::load_config(&dir);
    if let Some(mode) = args.mode {
        config.initial_mode = mode.into();
    }
    if args.front {
        config.camera = CameraPosition::Front;
    }
    if args.save_config {
        config_store::persist_config(&dir, &config)?;
        info!(path = %config_store::config_path(&dir).display(), "Configuration saved");
        if args.image.is_none() {
            return Ok(());
        }
    }

    let image = match &args.image {
        Some(path) => {
            let image = image::open(path).map_err(|err| {
                ScanlensError::ImageError(format!("cannot open {}: {err}", path.display()))
            })?;
            config.preview_size = Size::new(f64::from(image.width()), f64::from(image.height()));
            Some(image)
        }
        None => None,
    };

    let camera = open_camera(image.clone(), args.frames);
    info!(
        platform = camera.platform_name(),
        camera = ?config.camera,
        mode = %config.initial_mode,
        "Scanlens starting"
    );
    let source = camera.open_frame_source(config.camera)?;

    let repository = ScanRepository::new();
    let pipeline = Pipeline::new(
        &config,
        Collaborators {
            detectors: desktop_detectors(),
            still: camera.still_capture(),
            sink: Arc::new(repository.clone()),
            recognizer: text_recognizer(&config),
        },
    )?;

    let frames = pipeline.start(source)?.join()?;
    info!(frames, "Feed finished");

    if let Some(path) = &args.overlay {
        let mut surface = match &image {
            Some(image) => ImageSurface::new(image.to_rgba8()),
            None => ImageSurface::blank(
                config.preview_size.width.round() as u32,
                config.preview_size.height.round() as u32,
            ),
        };
        present(&pipeline.overlays(), &mut surface);
        surface
            .render()
            .save(path)
            .map_err(|err| ScanlensError::ImageError(format!("cannot write {}: {err}", path.display())))?;
        info!(path = %path.display(), "Overlay written");
    }

    if let Some(path) = &args.out {
        let record = pipeline.capture(pipeline.capture_settings()).await?;
        record
            .image
            .save(path)
            .map_err(|err| ScanlensError::ImageError(format!("cannot write {}: {err}", path.display())))?;
        info!(
            path = %path.display(),
            kind = ?record.kind,
            headline = %record.headline,
            sha256 = %record.image_sha256,
            "Scan written"
        );
    }

    if repository.is_empty() {
        info!("No scan captured");
    } else {
        info!(scans = repository.len(), "Done");
    }
    Ok(())
}

/// Replay `image` when one is given, otherwise the platform camera.
fn open_camera(image: Option<DynamicImage>, frames: usize) -> Box<dyn CameraBridge> {
    match image {
        Some(image) => Box::new(ReplayCamera::new(image, frames)),
        None => scanlens_bridge::platform_camera(),
    }
}

/// Backends available without a native vision framework. Face modes have
/// none and run like camera mode.
fn desktop_detectors() -> DetectorSet {
    DetectorSet::new()
        .with_barcode(RxingBarcodeDetector::new())
        .with_document(HoughRectangleDetector::default())
}

#[cfg(feature = "ocr")]
fn text_recognizer(config: &PipelineConfig) -> Option<Arc<dyn TextRecognizer>> {
    use scanlens_vision::scan::ocr::{OcrModels, OcrTextRecognizer};

    if !config.recognize_text {
        return None;
    }
    let models = OcrModels::default();
    if !models.available() {
        warn!(path = %models.detection.display(), "OCR models missing; text recognition disabled");
        return None;
    }
    match OcrTextRecognizer::new(&models) {
        Ok(recognizer) => Some(Arc::new(recognizer)),
        Err(err) => {
            warn!(error = %err, "OCR engine failed to load; text recognition disabled");
            None
        }
    }
}

#[cfg(not(feature = "ocr"))]
fn text_recognizer(config: &PipelineConfig) -> Option<Arc<dyn TextRecognizer>> {
    if config.recognize_text {
        warn!("Built without the `ocr` feature; text recognition disabled");
    }
    None
}
