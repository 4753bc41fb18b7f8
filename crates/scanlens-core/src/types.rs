// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanlens camera pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{DisplayPoint, DisplayRect, NormalizedPoint, NormalizedRect, Size};

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// Mutually exclusive analysis modes. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mode {
    /// Plain capture, no per-frame detector.
    Camera,
    Barcode,
    /// Document rectangle detection; capture triggers rectification.
    Document,
    FaceLandmarks,
    /// Face orientation ("pitch"), a vertical gaze segment.
    FacePitch,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Camera,
        Mode::Barcode,
        Mode::Document,
        Mode::FaceLandmarks,
        Mode::FacePitch,
    ];

    /// Which kind of detector backend this mode routes frames to.
    pub fn capability(&self) -> DetectorCapability {
        match self {
            Self::Camera => DetectorCapability::None,
            Self::Barcode | Self::Document => DetectorCapability::Stateless,
            Self::FaceLandmarks | Self::FacePitch => DetectorCapability::Sequential,
        }
    }

    pub fn is_face(&self) -> bool {
        matches!(self, Self::FaceLandmarks | Self::FacePitch)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Barcode => "barcode",
            Self::Document => "document",
            Self::FaceLandmarks => "face-landmarks",
            Self::FacePitch => "face-pitch",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Detector capability required by a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorCapability {
    /// No detector runs (camera mode).
    None,
    /// Independent per-frame classification (barcode, rectangle).
    Stateless,
    /// Detector keeps tracking state across consecutive frames (faces).
    Sequential,
}

// ---------------------------------------------------------------------------
// Transform context
// ---------------------------------------------------------------------------

/// Physical orientation of the device relative to its natural portrait pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    /// Home button / bottom edge on the right.
    LandscapeLeft,
    /// Home button / bottom edge on the left.
    LandscapeRight,
}

impl DeviceOrientation {
    /// Clockwise quarter turns from sensor space to the displayed image.
    pub fn quarter_turns(&self) -> u8 {
        match self {
            Self::Portrait => 0,
            Self::LandscapeRight => 1,
            Self::PortraitUpsideDown => 2,
            Self::LandscapeLeft => 3,
        }
    }

    pub fn swaps_axes(&self) -> bool {
        self.quarter_turns() % 2 == 1
    }
}

/// Which physical camera is feeding frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraPosition {
    Front,
    #[default]
    Back,
}

/// Everything needed to map normalized detector geometry onto the display.
///
/// Copied as a whole at the start of each frame so a frame never mixes values
/// from before and after an orientation or camera change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformContext {
    pub preview_size: Size,
    pub orientation: DeviceOrientation,
    pub camera: CameraPosition,
}

impl TransformContext {
    pub fn new(preview_size: Size, orientation: DeviceOrientation, camera: CameraPosition) -> Self {
        Self {
            preview_size,
            orientation,
            camera,
        }
    }
}

// ---------------------------------------------------------------------------
// Detections
// ---------------------------------------------------------------------------

/// Named groups of facial landmark points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LandmarkKind {
    LeftEye,
    RightEye,
    LeftEyebrow,
    RightEyebrow,
    Nose,
    OuterLips,
    InnerLips,
    FaceContour,
    LeftPupil,
    RightPupil,
}

impl LandmarkKind {
    /// Eyes and lips are outlines; the rest are open strokes.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::LeftEye | Self::RightEye | Self::OuterLips | Self::InnerLips
        )
    }
}

/// A detected barcode.
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeDetection {
    pub bounds: NormalizedRect,
    pub confidence: f32,
    pub payload: String,
}

/// Corners of a detected quadrilateral in normalized space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuadCorners {
    pub top_left: NormalizedPoint,
    pub top_right: NormalizedPoint,
    pub bottom_left: NormalizedPoint,
    pub bottom_right: NormalizedPoint,
}

impl QuadCorners {
    /// Corners in `[top_left, top_right, bottom_left, bottom_right]` order.
    pub fn as_array(&self) -> [NormalizedPoint; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    /// Corners of an axis-aligned rectangle.
    pub fn from_rect(rect: &NormalizedRect) -> Self {
        Self {
            top_left: NormalizedPoint::new(rect.origin.x, rect.max_y()),
            top_right: NormalizedPoint::new(rect.max_x(), rect.max_y()),
            bottom_left: rect.origin,
            bottom_right: NormalizedPoint::new(rect.max_x(), rect.origin.y),
        }
    }
}

/// A detected document-like rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct RectangleDetection {
    pub corners: QuadCorners,
    pub bounds: NormalizedRect,
    pub confidence: f32,
}

impl RectangleDetection {
    /// Build a detection whose bounds are derived from its corners.
    pub fn from_corners(corners: QuadCorners, confidence: f32) -> Self {
        let bounds = NormalizedRect::bounding(&corners.as_array()).unwrap_or_default();
        Self {
            corners,
            bounds,
            confidence,
        }
    }
}

/// A detected face with landmark groups.
///
/// Landmark points are normalized within `bounds`, not within the frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceDetection {
    pub bounds: NormalizedRect,
    pub landmarks: BTreeMap<LandmarkKind, Vec<NormalizedPoint>>,
}

impl FaceDetection {
    pub fn landmark(&self, kind: LandmarkKind) -> Option<&[NormalizedPoint]> {
        self.landmarks
            .get(&kind)
            .map(Vec::as_slice)
            .filter(|points| !points.is_empty())
    }
}

/// Output of a detector backend for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Barcode(BarcodeDetection),
    Rectangle(RectangleDetection),
    Face(FaceDetection),
}

impl Detection {
    /// Detector-reported confidence; faces carry none.
    pub fn confidence(&self) -> Option<f32> {
        match self {
            Self::Barcode(b) => Some(b.confidence),
            Self::Rectangle(r) => Some(r.confidence),
            Self::Face(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Overlay state
// ---------------------------------------------------------------------------

/// Estimated vertical gaze, drawn as a segment from `origin` to `focus`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pitch {
    pub origin: DisplayPoint,
    pub focus: DisplayPoint,
}

impl Pitch {
    pub const fn cleared() -> Self {
        Self {
            origin: DisplayPoint::ZERO,
            focus: DisplayPoint::ZERO,
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.origin == DisplayPoint::ZERO && self.focus == DisplayPoint::ZERO
    }
}

/// A barcode box ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeOverlay {
    pub bounds: DisplayRect,
    pub payload: String,
}

/// A document quad ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentOverlay {
    pub bounds: DisplayRect,
    /// `[top_left, top_right, bottom_right, bottom_left]`, drawing order.
    pub outline: [DisplayPoint; 4],
    pub confidence: f32,
}

/// One landmark group converted to display space.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkPath {
    pub kind: LandmarkKind,
    pub points: Vec<DisplayPoint>,
    pub closed: bool,
}

/// Face box and landmark polylines ready to draw.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceOverlay {
    pub bounds: DisplayRect,
    pub landmarks: Vec<LandmarkPath>,
}

/// The most recent drawable geometry for one mode.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OverlayState {
    #[default]
    Empty,
    Barcodes(Vec<BarcodeOverlay>),
    Documents(Vec<DocumentOverlay>),
    Face(FaceOverlay),
    Pitch(Pitch),
}

impl OverlayState {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Barcodes(items) => items.is_empty(),
            Self::Documents(items) => items.is_empty(),
            Self::Face(_) => false,
            Self::Pitch(pitch) => pitch.is_cleared(),
        }
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Flash behaviour for still captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlashMode {
    #[default]
    Auto,
    On,
    Off,
}

impl FlashMode {
    /// Next mode in the auto → on → off → auto cycle of the flash toggle.
    pub fn cycle(&self) -> Self {
        match self {
            Self::Auto => Self::On,
            Self::On => Self::Off,
            Self::Off => Self::Auto,
        }
    }
}

/// Settings passed to the still-image capture collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureSettings {
    pub flash: FlashMode,
}

/// Unique identifier for a finalized scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(pub Uuid);

impl ScanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a scan's image was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanKind {
    /// Perspective-rectified document crop.
    Rectified,
    /// The captured photo as-is.
    Photo,
}
