// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub camera for desktop/CI builds where no native camera API is wired up.
//
// Every call fails with `PlatformUnavailable`; use `ReplayCamera` to drive the
// pipeline from a still image instead.

use std::sync::Arc;

use image::DynamicImage;
use scanlens_core::error::{Result, ScanlensError};
use scanlens_core::types::{CameraPosition, CaptureSettings};

use crate::traits::*;

/// No-op camera returned on platforms without a native backend.
pub struct StubCamera;

impl CameraBridge for StubCamera {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn open_frame_source(&self, camera: CameraPosition) -> Result<Box<dyn FrameSource>> {
        tracing::warn!(?camera, "CameraBridge::open_frame_source called on stub camera");
        Err(ScanlensError::PlatformUnavailable)
    }

    fn still_capture(&self) -> Arc<dyn StillCapture> {
        Arc::new(StubCamera)
    }
}

impl StillCapture for StubCamera {
    fn capture_photo(&self, _settings: &CaptureSettings) -> Result<DynamicImage> {
        tracing::warn!("StillCapture::capture_photo called on stub camera");
        Err(ScanlensError::PlatformUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_reports_platform_unavailable() {
        let camera = crate::platform_camera();
        assert_eq!(camera.platform_name(), "Desktop (stub)");
        assert!(matches!(
            camera.open_frame_source(CameraPosition::Back),
            Err(ScanlensError::PlatformUnavailable)
        ));
        assert!(matches!(
            camera.still_capture().capture_photo(&CaptureSettings::default()),
            Err(ScanlensError::PlatformUnavailable)
        ));
    }
}
