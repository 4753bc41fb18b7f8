// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the pipeline's collaborators.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use scanlens_core::error::Result;
use scanlens_core::types::{
    CameraPosition, CaptureSettings, Detection, DeviceOrientation, Mode, OverlayState,
};

use crate::record::ScanRecord;

/// One video frame as delivered by the camera.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Shared pixel buffer. Detectors only borrow it.
    pub pixels: Arc<DynamicImage>,
    /// Capture time relative to the start of the session.
    pub timestamp: Duration,
    /// Orientation the sensor reports for this buffer.
    pub orientation: DeviceOrientation,
}

/// Delivers frames in capture order.
///
/// `next_frame` blocks until a frame is available. The pipeline pulls one
/// frame at a time and never buffers ahead, so a slow pipeline makes the
/// source drop frames rather than queue them.
pub trait FrameSource: Send {
    /// Open the device. Fails with `Configuration` / `PlatformUnavailable`
    /// when no frames can ever flow.
    fn start(&mut self) -> Result<()>;

    /// Next frame, or `None` when the source has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Release the device. Called once after the last frame.
    fn stop(&mut self) {}
}

/// Per-frame detector without cross-frame state (barcodes, rectangles).
pub trait StatelessDetector: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn detect(&self, pixels: &DynamicImage, orientation: DeviceOrientation)
    -> Result<Vec<Detection>>;
}

/// Detector that tracks its subject across consecutive frames (faces).
///
/// The backend owns whatever state it keeps; the pipeline never inspects it.
pub trait SequentialDetector: Send {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn detect_sequential(
        &mut self,
        pixels: &DynamicImage,
        orientation: DeviceOrientation,
    ) -> Result<Vec<Detection>>;

    /// Drop tracking state, e.g. when a face mode is re-entered.
    fn reset(&mut self) {}
}

/// Surface that draws overlays. Only called from the rendering side.
pub trait DisplaySurface {
    fn draw_overlay(&mut self, mode: Mode, overlay: &OverlayState);

    fn clear_overlay(&mut self, mode: Mode);
}

/// Takes full-resolution still photos.
pub trait StillCapture: Send + Sync {
    /// Capture a photo. Blocking; the pipeline calls it off the async runtime.
    fn capture_photo(&self, settings: &CaptureSettings) -> Result<DynamicImage>;
}

/// Receives finalized scans. Lives for the whole process.
pub trait ResultSink: Send + Sync {
    fn submit(&self, record: ScanRecord) -> Result<()>;
}

/// Extracts text lines from a captured image.
pub trait TextRecognizer: Send + Sync {
    /// Recognized lines in reading order.
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>>;
}

/// A device camera: opens live frame sources and takes stills.
pub trait CameraBridge: Send + Sync {
    /// Human-readable platform name (e.g. "iOS 17", "Desktop (stub)").
    fn platform_name(&self) -> &str;

    /// Open a live frame source for the given camera.
    fn open_frame_source(&self, camera: CameraPosition) -> Result<Box<dyn FrameSource>>;

    /// Still capture backed by the same device.
    fn still_capture(&self) -> Arc<dyn StillCapture>;
}
