// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Scanlens pipeline: wires frames, detectors, overlays and capture together.
//!
//! - [`dispatch`]: the mode state machine and per-frame detector routing
//! - [`overlay`]: the latest drawable state per mode, swapped atomically
//! - [`render`]: overlay styling and presentation to a display surface
//! - [`sink`]: in-memory result sink
//! - [`orchestrator`]: the frame thread and the async capture path

pub mod dispatch;
pub mod orchestrator;
pub mod overlay;
pub mod render;
pub mod sink;

pub use dispatch::{DetectorDispatch, DetectorSet, ModeTransition};
pub use orchestrator::{Collaborators, Pipeline, PipelineEvent, PipelineHandle};
pub use overlay::{OverlaySnapshot, OverlayStore};
pub use render::{DrawCommand, ImageSurface, Stroke, draw_commands, present};
pub use sink::ScanRepository;
