// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vertical gaze heuristic from face landmarks.
//
// Raised eyebrows flatten their bounding box; lowered ones bunch up. The mean
// eyebrow aspect ratio (height / width x 100, measured on the display) is
// bucketed into up / straight / down, and the focus point is pushed far off
// screen in the matching direction.

use scanlens_core::config::GazeCalibration;
use scanlens_core::geometry::{DisplayPoint, DisplayRect, GEOMETRY_EPSILON};
use scanlens_core::types::{FaceDetection, LandmarkKind, Pitch};
use tracing::debug;

use crate::transform::CoordinateTransformer;

/// Coarse vertical gaze direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazeBand {
    Up,
    Straight,
    Down,
}

impl GazeBand {
    /// Bucket an eyebrow aspect value. Both band edges count as straight.
    pub fn classify(diff: f64, calibration: &GazeCalibration) -> Self {
        if diff < calibration.straight_min {
            Self::Up
        } else if diff > calibration.straight_max {
            Self::Down
        } else {
            Self::Straight
        }
    }
}

/// Stateless gaze estimator; one call per frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GazeEstimator {
    calibration: GazeCalibration,
}

impl GazeEstimator {
    pub fn new(calibration: GazeCalibration) -> Self {
        Self { calibration }
    }

    /// Pitch for `face`, or [`Pitch::cleared`] when pupils or eyebrows are
    /// missing or an eyebrow has no width.
    pub fn estimate(&self, face: &FaceDetection, transformer: &CoordinateTransformer) -> Pitch {
        let Some(origin) = self.pupil_center(face, transformer) else {
            return Pitch::cleared();
        };
        let Some(diff) = eyebrow_aspect(face, transformer) else {
            return Pitch::cleared();
        };

        let band = GazeBand::classify(diff, &self.calibration);
        let focus_y = match band {
            GazeBand::Up => self.calibration.up_focus_y,
            GazeBand::Straight => origin.y,
            GazeBand::Down => self.calibration.down_focus_y,
        };
        debug!(diff, ?band, "gaze estimated");

        Pitch {
            origin,
            focus: DisplayPoint::new(origin.x, focus_y),
        }
    }

    fn pupil_center(
        &self,
        face: &FaceDetection,
        transformer: &CoordinateTransformer,
    ) -> Option<DisplayPoint> {
        let left = group_centroid(face, LandmarkKind::LeftPupil, transformer)?;
        let right = group_centroid(face, LandmarkKind::RightPupil, transformer)?;
        DisplayPoint::centroid(&[left, right])
    }
}

fn group_points(
    face: &FaceDetection,
    kind: LandmarkKind,
    transformer: &CoordinateTransformer,
) -> Option<Vec<DisplayPoint>> {
    let points = face.landmark(kind)?;
    Some(
        points
            .iter()
            .map(|p| transformer.landmark_to_display(*p, &face.bounds))
            .collect(),
    )
}

fn group_centroid(
    face: &FaceDetection,
    kind: LandmarkKind,
    transformer: &CoordinateTransformer,
) -> Option<DisplayPoint> {
    DisplayPoint::centroid(&group_points(face, kind, transformer)?)
}

/// Mean of both eyebrows' height / width x 100 in display space.
fn eyebrow_aspect(face: &FaceDetection, transformer: &CoordinateTransformer) -> Option<f64> {
    let mut total = 0.0;
    for kind in [LandmarkKind::LeftEyebrow, LandmarkKind::RightEyebrow] {
        let points = group_points(face, kind, transformer)?;
        let bounds = DisplayRect::bounding(&points)?;
        if bounds.width <= GEOMETRY_EPSILON {
            return None;
        }
        total += bounds.height / bounds.width * 100.0;
    }
    Some(total / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use scanlens_core::geometry::{NormalizedPoint, NormalizedRect, Size};
    use scanlens_core::types::{CameraPosition, DeviceOrientation, TransformContext};

    fn transformer() -> CoordinateTransformer {
        CoordinateTransformer::new(TransformContext::new(
            Size::new(100.0, 100.0),
            DeviceOrientation::Portrait,
            CameraPosition::Back,
        ))
        .expect("valid context")
    }

    /// Face covering the whole frame with eyebrows 20 px wide and
    /// `brow_height` px tall.
    fn face(brow_height: f64) -> FaceDetection {
        let rise = brow_height / 100.0;
        let mut landmarks = BTreeMap::new();
        landmarks.insert(
            LandmarkKind::LeftPupil,
            vec![NormalizedPoint::new(0.25, 0.5)],
        );
        landmarks.insert(
            LandmarkKind::RightPupil,
            vec![NormalizedPoint::new(0.75, 0.5)],
        );
        landmarks.insert(
            LandmarkKind::LeftEyebrow,
            vec![
                NormalizedPoint::new(0.125, 0.75),
                NormalizedPoint::new(0.325, 0.75 + rise),
            ],
        );
        landmarks.insert(
            LandmarkKind::RightEyebrow,
            vec![
                NormalizedPoint::new(0.625, 0.75),
                NormalizedPoint::new(0.825, 0.75 + rise),
            ],
        );
        FaceDetection {
            bounds: NormalizedRect::new(0.0, 0.0, 1.0, 1.0),
            landmarks,
        }
    }

    #[test]
    fn band_table() {
        let calibration = GazeCalibration::default();
        assert_eq!(GazeBand::classify(20.0, &calibration), GazeBand::Straight);
        assert_eq!(GazeBand::classify(10.0, &calibration), GazeBand::Up);
        assert_eq!(GazeBand::classify(30.0, &calibration), GazeBand::Down);
    }

    #[test]
    fn band_edges_are_straight() {
        let calibration = GazeCalibration::default();
        assert_eq!(GazeBand::classify(17.0, &calibration), GazeBand::Straight);
        assert_eq!(GazeBand::classify(25.0, &calibration), GazeBand::Straight);
        assert_eq!(GazeBand::classify(16.999, &calibration), GazeBand::Up);
        assert_eq!(GazeBand::classify(25.001, &calibration), GazeBand::Down);
    }

    #[test]
    fn straight_gaze_keeps_focus_on_pupils() {
        let pitch = GazeEstimator::default().estimate(&face(4.0), &transformer());
        assert!((pitch.origin.x - 50.0).abs() < 1e-9);
        assert!((pitch.origin.y - 50.0).abs() < 1e-9);
        assert_eq!(pitch.focus.x, pitch.origin.x);
        assert_eq!(pitch.focus.y, pitch.origin.y);
    }

    #[test]
    fn flat_brows_look_up() {
        let pitch = GazeEstimator::default().estimate(&face(2.0), &transformer());
        assert_eq!(pitch.focus.y, -500.0);
    }

    #[test]
    fn tall_brows_look_down() {
        let pitch = GazeEstimator::default().estimate(&face(6.0), &transformer());
        assert_eq!(pitch.focus.y, 1500.0);
    }

    #[test]
    fn missing_pupils_clear_pitch() {
        let mut f = face(4.0);
        f.landmarks.remove(&LandmarkKind::RightPupil);
        assert!(GazeEstimator::default().estimate(&f, &transformer()).is_cleared());
    }

    #[test]
    fn zero_width_eyebrow_clears_pitch() {
        let mut f = face(4.0);
        f.landmarks.insert(
            LandmarkKind::LeftEyebrow,
            vec![NormalizedPoint::new(0.2, 0.7), NormalizedPoint::new(0.2, 0.8)],
        );
        assert!(GazeEstimator::default().estimate(&f, &transformer()).is_cleared());
    }
}
