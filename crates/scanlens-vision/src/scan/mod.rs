// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document scanning: quadrilateral detection, perspective rectification and
// optical character recognition (OCR).

pub mod quad;
pub mod rectify;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use quad::HoughRectangleDetector;
pub use rectify::{PerspectiveRectifier, RectifiedDocument};

#[cfg(feature = "ocr")]
pub use ocr::OcrTextRecognizer;
