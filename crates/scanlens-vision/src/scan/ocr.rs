// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text recognition for captured scans, backed by the `ocrs` engine.
//
// Only built with the `ocr` feature. The engine needs two model files,
// `text-detection.rten` and `text-recognition.rten`, which `ocrs-cli` caches
// under `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`) on first use.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use scanlens_bridge::traits::TextRecognizer;
use scanlens_core::error::{Result, ScanlensError};
use tracing::{debug, info, instrument};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find the OCR model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrModels {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl Default for OcrModels {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrModels {
    /// Expects `text-detection.rten` and `text-recognition.rten` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn available(&self) -> bool {
        self.detection.exists() && self.recognition.exists()
    }

    fn load(path: &Path) -> Result<Model> {
        if !path.exists() {
            return Err(ScanlensError::OcrError(format!(
                "model not found at {}; run `ocrs-cli` once to download models",
                path.display()
            )));
        }
        Model::load_file(path).map_err(|err| {
            ScanlensError::OcrError(format!("failed to load model {}: {err}", path.display()))
        })
    }
}

/// [`TextRecognizer`] that returns one string per recognized text line.
pub struct OcrTextRecognizer {
    engine: OcrEngine,
}

impl OcrTextRecognizer {
    /// Load both models. Slow; build once and share.
    #[instrument(skip_all, fields(
        detection = %models.detection.display(),
        recognition = %models.recognition.display(),
    ))]
    pub fn new(models: &OcrModels) -> Result<Self> {
        let detection_model = OcrModels::load(&models.detection)?;
        let recognition_model = OcrModels::load(&models.recognition)?;
        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| ScanlensError::OcrError(format!("failed to initialise OCR engine: {err}")))?;
        info!("OCR engine ready");
        Ok(Self { engine })
    }
}

impl TextRecognizer for OcrTextRecognizer {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            ScanlensError::OcrError(format!("bad image source ({width}x{height}): {err}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| ScanlensError::OcrError(format!("OCR preprocessing failed: {err}")))?;

        let words = self
            .engine
            .detect_words(&input)
            .map_err(|err| ScanlensError::OcrError(format!("word detection failed: {err}")))?;
        let line_rects = self.engine.find_text_lines(&input, &words);
        let lines = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| ScanlensError::OcrError(format!("line recognition failed: {err}")))?;

        let text: Vec<String> = lines
            .iter()
            .flatten()
            .map(|line| line.to_string())
            .filter(|line| !line.trim().is_empty())
            .collect();
        debug!(lines = text.len(), "Text recognized");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_from_dir() {
        let models = OcrModels::from_dir("/tmp/my-models");
        assert_eq!(models.detection, PathBuf::from("/tmp/my-models/text-detection.rten"));
        assert_eq!(
            models.recognition,
            PathBuf::from("/tmp/my-models/text-recognition.rten")
        );
    }

    #[test]
    fn missing_models_fail_to_load() {
        let models = OcrModels::from_dir("/nonexistent/ocr-models");
        assert!(!models.available());
        assert!(matches!(
            OcrTextRecognizer::new(&models),
            Err(ScanlensError::OcrError(_))
        ));
    }
}
