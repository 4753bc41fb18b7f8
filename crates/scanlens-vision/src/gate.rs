// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Confidence thresholds per detection kind.

use scanlens_core::config::GatePolicy;
use scanlens_core::types::{Detection, RectangleDetection};

/// Decides which detections are confident enough to draw or capture.
///
/// Thresholds are inclusive. Faces carry no confidence and always pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfidenceGate {
    policy: GatePolicy,
}

impl ConfidenceGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Whether `detection` may be shown in the live preview.
    pub fn accept(&self, detection: &Detection) -> bool {
        match detection {
            Detection::Barcode(barcode) => barcode.confidence >= self.policy.barcode_min,
            Detection::Rectangle(rect) => rect.confidence >= self.policy.rectangle_preview_min,
            Detection::Face(_) => true,
        }
    }

    /// Whether `rect` is trustworthy enough to rectify on capture.
    pub fn accept_for_capture(&self, rect: &RectangleDetection) -> bool {
        rect.confidence >= self.policy.rectangle_capture_min
    }

    /// Keep only the detections that pass [`accept`](Self::accept).
    pub fn filter(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections
            .into_iter()
            .filter(|detection| self.accept(detection))
            .collect()
    }
}
