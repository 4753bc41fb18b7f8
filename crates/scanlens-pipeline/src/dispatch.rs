// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mode state machine and per-frame detector routing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use image::DynamicImage;
use scanlens_bridge::traits::{SequentialDetector, StatelessDetector};
use scanlens_core::error::Result;
use scanlens_core::types::{Detection, DetectorCapability, DeviceOrientation, Mode};
use tracing::{debug, info, instrument, warn};

/// A sequential backend plus a reset request raised by mode changes.
///
/// The reset is applied by the frame thread under the detector lock, right
/// before the next detection, so a mode change never waits on a detection
/// in flight.
pub struct SequentialSlot {
    detector: Mutex<Box<dyn SequentialDetector>>,
    reset_pending: AtomicBool,
}

impl SequentialSlot {
    fn detect(&self, pixels: &DynamicImage, orientation: DeviceOrientation) -> Result<Vec<Detection>> {
        let mut detector = self.detector.lock().unwrap_or_else(PoisonError::into_inner);
        if self.reset_pending.swap(false, Ordering::SeqCst) {
            debug!(detector = detector.name(), "resetting tracker");
            detector.reset();
        }
        detector.detect_sequential(pixels, orientation)
    }
}

type SharedSequential = Arc<SequentialSlot>;

/// Detector backends available to the pipeline. Any slot may be empty.
#[derive(Clone, Default)]
pub struct DetectorSet {
    barcode: Option<Arc<dyn StatelessDetector>>,
    document: Option<Arc<dyn StatelessDetector>>,
    face: Option<SharedSequential>,
}

impl DetectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_barcode(mut self, detector: impl StatelessDetector + 'static) -> Self {
        self.barcode = Some(Arc::new(detector));
        self
    }

    pub fn with_document(mut self, detector: impl StatelessDetector + 'static) -> Self {
        self.document = Some(Arc::new(detector));
        self
    }

    pub fn with_face(mut self, detector: impl SequentialDetector + 'static) -> Self {
        let boxed: Box<dyn SequentialDetector> = Box::new(detector);
        self.face = Some(Arc::new(SequentialSlot {
            detector: Mutex::new(boxed),
            reset_pending: AtomicBool::new(false),
        }));
        self
    }

    fn has_backend(&self, mode: Mode) -> bool {
        match mode {
            Mode::Camera => true,
            Mode::Barcode => self.barcode.is_some(),
            Mode::Document => self.document.is_some(),
            Mode::FaceLandmarks | Mode::FacePitch => self.face.is_some(),
        }
    }
}

/// The backend a frame is sent to. Cloned out of the dispatcher so detection
/// runs without holding the dispatcher lock.
#[derive(Clone)]
pub enum Route {
    /// Camera mode, or a mode without a backend.
    Idle,
    Stateless(Arc<dyn StatelessDetector>),
    Sequential(SharedSequential),
}

impl Route {
    /// Run the backend synchronously. `Idle` detects nothing.
    pub fn detect(
        &self,
        pixels: &DynamicImage,
        orientation: DeviceOrientation,
    ) -> Result<Vec<Detection>> {
        match self {
            Self::Idle => Ok(Vec::new()),
            Self::Stateless(detector) => detector.detect(pixels, orientation),
            Self::Sequential(slot) => slot.detect(pixels, orientation),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// A completed mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: Mode,
    pub to: Mode,
}

/// Owns the current [`Mode`] and decides which backend sees each frame.
///
/// Exactly one backend runs per frame. Camera mode runs none.
pub struct DetectorDispatch {
    mode: Mode,
    detectors: DetectorSet,
}

impl DetectorDispatch {
    pub fn new(detectors: DetectorSet, initial: Mode) -> Self {
        Self {
            mode: initial,
            detectors,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Move to `to`. Returns `None` when already there.
    ///
    /// Entering a face mode from a non-face mode marks the face tracker for
    /// a reset before its next detection, so it does not continue a track
    /// from an earlier session.
    #[instrument(skip(self), fields(from = %self.mode))]
    pub fn transition(&mut self, to: Mode) -> Option<ModeTransition> {
        let from = self.mode;
        if from == to {
            return None;
        }
        if to.is_face() && !from.is_face() {
            if let Some(face) = &self.detectors.face {
                face.reset_pending.store(true, Ordering::SeqCst);
            }
        }
        if !self.detectors.has_backend(to) {
            warn!(mode = %to, "No detector registered; mode runs without detection");
        }
        self.mode = to;
        info!(%from, %to, "Mode changed");
        Some(ModeTransition { from, to })
    }

    /// Backend for the current mode.
    pub fn route(&self) -> Route {
        self.route_for(self.mode)
    }

    pub fn route_for(&self, mode: Mode) -> Route {
        let route = match mode.capability() {
            DetectorCapability::None => None,
            DetectorCapability::Stateless => match mode {
                Mode::Barcode => self.detectors.barcode.clone().map(Route::Stateless),
                _ => self.detectors.document.clone().map(Route::Stateless),
            },
            DetectorCapability::Sequential => self.detectors.face.clone().map(Route::Sequential),
        };
        route.unwrap_or(Route::Idle)
    }
}
