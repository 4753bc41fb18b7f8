// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanlensError};
use crate::geometry::Size;
use crate::types::{CameraPosition, CaptureSettings, DeviceOrientation, Mode, TransformContext};

/// Minimum detector confidence per detection kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatePolicy {
    pub barcode_min: f32,
    /// Threshold for drawing a rectangle in the live preview.
    pub rectangle_preview_min: f32,
    /// Stricter threshold for the rectangle that a capture will rectify.
    pub rectangle_capture_min: f32,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            barcode_min: 0.90,
            rectangle_preview_min: 0.90,
            rectangle_capture_min: 0.98,
        }
    }
}

/// Calibration bands for the eyebrow-aspect gaze heuristic.
///
/// `diff` below `straight_min` reads as looking up, above `straight_max` as
/// looking down; both bounds belong to the straight-ahead band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeCalibration {
    pub straight_min: f64,
    pub straight_max: f64,
    /// Display-space y of the focus point when looking up (offscreen, above).
    pub up_focus_y: f64,
    /// Display-space y of the focus point when looking down (offscreen, below).
    pub down_focus_y: f64,
}

impl Default for GazeCalibration {
    fn default() -> Self {
        Self {
            straight_min: 17.0,
            straight_max: 25.0,
            up_focus_y: -500.0,
            down_focus_y: 1500.0,
        }
    }
}

/// Bounds on rectified output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyLimits {
    /// Longest allowed side of a rectified image, in pixels.
    pub max_side: u32,
}

impl Default for RectifyLimits {
    fn default() -> Self {
        Self { max_side: 8192 }
    }
}

/// Persistent pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Mode active when the pipeline starts.
    pub initial_mode: Mode,
    pub camera: CameraPosition,
    pub orientation: DeviceOrientation,
    /// Size of the preview surface overlays are drawn on.
    pub preview_size: Size,
    pub gate: GatePolicy,
    pub gaze: GazeCalibration,
    pub rectify: RectifyLimits,
    /// Settings used for still captures (flash is remembered between runs).
    pub capture: CaptureSettings,
    /// Run text recognition on captured images when a recognizer is present.
    pub recognize_text: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            initial_mode: Mode::Camera,
            camera: CameraPosition::Back,
            orientation: DeviceOrientation::Portrait,
            preview_size: Size::new(1080.0, 1920.0),
            gate: GatePolicy::default(),
            gaze: GazeCalibration::default(),
            rectify: RectifyLimits::default(),
            capture: CaptureSettings::default(),
            recognize_text: true,
        }
    }
}

impl PipelineConfig {
    /// Transform context implied by the configured preview, orientation and camera.
    pub fn transform_context(&self) -> TransformContext {
        TransformContext::new(self.preview_size, self.orientation, self.camera)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("barcode_min", self.gate.barcode_min),
            ("rectangle_preview_min", self.gate.rectangle_preview_min),
            ("rectangle_capture_min", self.gate.rectangle_capture_min),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScanlensError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.gate.rectangle_capture_min < self.gate.rectangle_preview_min {
            return Err(ScanlensError::InvalidConfig(format!(
                "rectangle_capture_min ({}) is looser than rectangle_preview_min ({})",
                self.gate.rectangle_capture_min, self.gate.rectangle_preview_min
            )));
        }
        if !(self.gaze.straight_min <= self.gaze.straight_max) {
            return Err(ScanlensError::InvalidConfig(format!(
                "gaze band is inverted: straight_min {} > straight_max {}",
                self.gaze.straight_min, self.gaze.straight_max
            )));
        }
        if self.preview_size.is_empty() {
            return Err(ScanlensError::InvalidConfig(format!(
                "preview size must be positive, got {}x{}",
                self.preview_size.width, self.preview_size.height
            )));
        }
        if self.rectify.max_side == 0 {
            return Err(ScanlensError::InvalidConfig(
                "rectify.max_side must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
