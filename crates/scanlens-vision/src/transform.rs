// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalized detector coordinates <-> display pixel coordinates.
//
// Detectors report positions in the unit square with the origin at the
// bottom-left. The display has its origin at the top-left and is measured in
// pixels. The mapping is a single affine transform composed from:
//
//   1. vertical flip            (x, y) -> (x, 1 - y)
//   2. device rotation          quarter turns about the square's centre
//   3. front-camera mirror      (x, y) -> (1 - x, y)
//   4. scale to preview size
//
// Rotation and mirroring happen inside the unit square so the scaled result
// always lands inside the preview.

use scanlens_core::error::{Result, ScanlensError};
use scanlens_core::geometry::{
    Affine2, DisplayPoint, DisplayRect, NormalizedPoint, NormalizedRect,
};
use scanlens_core::types::{CameraPosition, TransformContext};

/// Maps geometry between detector space and display space for one
/// [`TransformContext`] snapshot.
///
/// Build one per frame from the context copied at frame start; every
/// conversion in that frame then agrees on orientation and camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransformer {
    context: TransformContext,
    forward: Affine2,
    inverse: Affine2,
}

impl CoordinateTransformer {
    /// Fails with `InvalidConfig` when the preview has no area.
    pub fn new(context: TransformContext) -> Result<Self> {
        let forward = compose(&context);
        let inverse = forward.inverse().ok_or_else(|| {
            ScanlensError::InvalidConfig(format!(
                "preview size {}x{} cannot be mapped",
                context.preview_size.width, context.preview_size.height
            ))
        })?;
        Ok(Self {
            context,
            forward,
            inverse,
        })
    }

    pub fn context(&self) -> &TransformContext {
        &self.context
    }

    pub fn to_display_point(&self, point: NormalizedPoint) -> DisplayPoint {
        let (x, y) = self.forward.apply(point.x, point.y);
        DisplayPoint::new(x, y)
    }

    /// Display rectangle covering `rect`. Under a quarter turn width and
    /// height trade places.
    pub fn to_display(&self, rect: &NormalizedRect) -> DisplayRect {
        let corners = [
            NormalizedPoint::new(rect.origin.x, rect.origin.y),
            NormalizedPoint::new(rect.max_x(), rect.origin.y),
            NormalizedPoint::new(rect.origin.x, rect.max_y()),
            NormalizedPoint::new(rect.max_x(), rect.max_y()),
        ]
        .map(|corner| self.to_display_point(corner));
        DisplayRect::bounding(&corners).unwrap_or_default()
    }

    /// Map a landmark given relative to `reference` (the face box).
    ///
    /// A reference box without area collapses every landmark onto the box
    /// origin.
    pub fn landmark_to_display(
        &self,
        point: NormalizedPoint,
        reference: &NormalizedRect,
    ) -> DisplayPoint {
        if reference.is_degenerate() {
            return self.to_display_point(reference.origin);
        }
        self.to_display_point(reference.absolute_point(point))
    }

    pub fn to_normalized(&self, point: DisplayPoint) -> NormalizedPoint {
        let (x, y) = self.inverse.apply(point.x, point.y);
        NormalizedPoint::new(x, y)
    }

    pub fn to_normalized_rect(&self, rect: &DisplayRect) -> NormalizedRect {
        let corners = [
            DisplayPoint::new(rect.origin.x, rect.origin.y),
            DisplayPoint::new(rect.max_x(), rect.origin.y),
            DisplayPoint::new(rect.origin.x, rect.max_y()),
            DisplayPoint::new(rect.max_x(), rect.max_y()),
        ]
        .map(|corner| self.to_normalized(corner));
        NormalizedRect::bounding(&corners).unwrap_or_default()
    }
}

fn compose(context: &TransformContext) -> Affine2 {
    let rotated = Affine2::flip_unit_vertical()
        .then(Affine2::quarter_turns_unit(context.orientation.quarter_turns()));
    let oriented = match context.camera {
        CameraPosition::Front => rotated.then(Affine2::mirror_unit_horizontal()),
        CameraPosition::Back => rotated,
    };
    oriented.then(Affine2::scale(
        context.preview_size.width,
        context.preview_size.height,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanlens_core::geometry::Size;
    use scanlens_core::types::DeviceOrientation;

    fn transformer(orientation: DeviceOrientation, camera: CameraPosition) -> CoordinateTransformer {
        CoordinateTransformer::new(TransformContext::new(
            Size::new(400.0, 800.0),
            orientation,
            camera,
        ))
        .expect("valid context")
    }

    fn assert_point(actual: DisplayPoint, x: f64, y: f64) {
        assert!(
            (actual.x - x).abs() < 1e-9 && (actual.y - y).abs() < 1e-9,
            "expected ({x}, {y}), got {actual:?}"
        );
    }

    #[test]
    fn portrait_back_flips_y_and_scales() {
        let t = transformer(DeviceOrientation::Portrait, CameraPosition::Back);
        assert_point(t.to_display_point(NormalizedPoint::new(0.0, 0.0)), 0.0, 800.0);
        assert_point(t.to_display_point(NormalizedPoint::new(0.25, 1.0)), 100.0, 0.0);
    }

    #[test]
    fn front_camera_mirrors_horizontally() {
        let t = transformer(DeviceOrientation::Portrait, CameraPosition::Front);
        assert_point(t.to_display_point(NormalizedPoint::new(0.25, 1.0)), 300.0, 0.0);
    }

    #[test]
    fn rect_maps_to_top_left_origin() {
        let t = transformer(DeviceOrientation::Portrait, CameraPosition::Back);
        let rect = t.to_display(&NormalizedRect::new(0.25, 0.5, 0.5, 0.25));
        assert_point(rect.origin, 100.0, 200.0);
        assert!((rect.width - 200.0).abs() < 1e-9);
        assert!((rect.height - 200.0).abs() < 1e-9);
    }

    #[test]
    fn landscape_keeps_result_inside_preview() {
        let t = transformer(DeviceOrientation::LandscapeRight, CameraPosition::Back);
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.3, 0.6)] {
            let p = t.to_display_point(NormalizedPoint::new(x, y));
            assert!((0.0..=400.0).contains(&p.x) && (0.0..=800.0).contains(&p.y));
        }
    }

    #[test]
    fn landmark_resolves_inside_reference_box() {
        let t = transformer(DeviceOrientation::Portrait, CameraPosition::Back);
        let face = NormalizedRect::new(0.5, 0.5, 0.5, 0.5);
        let p = t.landmark_to_display(NormalizedPoint::new(0.5, 0.5), &face);
        assert_point(p, 300.0, 200.0);
    }

    #[test]
    fn zero_area_reference_box_yields_box_origin() {
        let t = transformer(DeviceOrientation::Portrait, CameraPosition::Back);
        let face = NormalizedRect::new(0.5, 0.25, 0.0, 0.0);
        let p = t.landmark_to_display(NormalizedPoint::new(0.9, 0.9), &face);
        assert_point(p, 200.0, 600.0);
    }

    #[test]
    fn rect_round_trips() {
        let t = transformer(DeviceOrientation::PortraitUpsideDown, CameraPosition::Front);
        let rect = NormalizedRect::new(0.125, 0.25, 0.5, 0.25);
        let back = t.to_normalized_rect(&t.to_display(&rect));
        assert!((back.origin.x - rect.origin.x).abs() < 1e-9);
        assert!((back.origin.y - rect.origin.y).abs() < 1e-9);
        assert!((back.width - rect.width).abs() < 1e-9);
        assert!((back.height - rect.height).abs() < 1e-9);
    }

    #[test]
    fn empty_preview_is_rejected() {
        let context = TransformContext::new(
            Size::new(0.0, 800.0),
            DeviceOrientation::Portrait,
            CameraPosition::Back,
        );
        assert!(matches!(
            CoordinateTransformer::new(context),
            Err(ScanlensError::InvalidConfig(_))
        ));
    }
}
