// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Replay camera: serves a still image as a live feed and as the captured photo.
//
// Used by the command-line front end and by tests to run the whole pipeline
// without camera hardware.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use scanlens_core::error::{Result, ScanlensError};
use scanlens_core::types::{CameraPosition, CaptureSettings, DeviceOrientation};
use tracing::debug;

use crate::traits::*;

/// Nominal spacing of replayed frames (~30 fps).
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Camera backed by a single decoded image.
#[derive(Clone)]
pub struct ReplayCamera {
    image: Arc<DynamicImage>,
    frames: usize,
    orientation: DeviceOrientation,
}

impl ReplayCamera {
    /// Replay `image` for `frames` frames in portrait orientation.
    pub fn new(image: DynamicImage, frames: usize) -> Self {
        Self {
            image: Arc::new(image),
            frames,
            orientation: DeviceOrientation::Portrait,
        }
    }

    /// A fresh frame source over the same image.
    pub fn frame_source(&self) -> ReplayFrameSource {
        ReplayFrameSource {
            image: Arc::clone(&self.image),
            remaining: self.frames,
            emitted: 0,
            orientation: self.orientation,
            started: false,
        }
    }
}

impl CameraBridge for ReplayCamera {
    fn platform_name(&self) -> &str {
        "Replay"
    }

    fn open_frame_source(&self, camera: CameraPosition) -> Result<Box<dyn FrameSource>> {
        debug!(?camera, frames = self.frames, "opening replay frame source");
        Ok(Box::new(self.frame_source()))
    }

    fn still_capture(&self) -> Arc<dyn StillCapture> {
        Arc::new(self.clone())
    }
}

impl StillCapture for ReplayCamera {
    fn capture_photo(&self, settings: &CaptureSettings) -> Result<DynamicImage> {
        debug!(flash = ?settings.flash, "replay capture");
        if self.image.width() == 0 || self.image.height() == 0 {
            return Err(ScanlensError::Capture("replay image is empty".into()));
        }
        Ok(self.image.as_ref().clone())
    }
}

/// Frame source that repeats one image a fixed number of times.
pub struct ReplayFrameSource {
    image: Arc<DynamicImage>,
    remaining: usize,
    emitted: u32,
    orientation: DeviceOrientation,
    started: bool,
}

impl FrameSource for ReplayFrameSource {
    fn start(&mut self) -> Result<()> {
        if self.image.width() == 0 || self.image.height() == 0 {
            return Err(ScanlensError::Configuration(
                "replay image has no pixels".into(),
            ));
        }
        self.started = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.started {
            return Err(ScanlensError::Bridge("frame source not started".into()));
        }
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let frame = Frame {
            pixels: Arc::clone(&self.image),
            timestamp: FRAME_INTERVAL * self.emitted,
            orientation: self.orientation,
        };
        self.emitted += 1;
        Ok(Some(frame))
    }

    fn stop(&mut self) {
        self.started = false;
    }
}
