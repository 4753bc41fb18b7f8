// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Scanlens vision: the per-frame geometry and image operations.
//!
//! - [`barcode`]: desktop barcode backend
//! - [`transform`]: normalized detector space to display space and back
//! - [`gate`]: confidence thresholds per detection kind
//! - [`gaze`]: vertical gaze heuristic from face landmarks
//! - [`scan`]: rectangle detection, perspective rectification and OCR

pub mod barcode;
pub mod gate;
pub mod gaze;
pub mod scan;
pub mod transform;

pub use barcode::RxingBarcodeDetector;
pub use gate::ConfidenceGate;
pub use gaze::{GazeBand, GazeEstimator};
pub use scan::{HoughRectangleDetector, PerspectiveRectifier, RectifiedDocument};
pub use transform::CoordinateTransformer;
