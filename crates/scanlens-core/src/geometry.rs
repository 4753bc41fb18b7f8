// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry value types: normalized (detector) space, display (pixel) space,
// and a small 2D affine transform used to move between them.
//
// Normalized space is the unit square with the origin at the BOTTOM-left
// corner, as reported by detectors. Display space is pixels with the origin at
// the TOP-left corner, as expected by drawing surfaces.

use serde::{Deserialize, Serialize};

/// Tolerance below which a determinant or extent is treated as zero.
pub const GEOMETRY_EPSILON: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Normalized space
// ---------------------------------------------------------------------------

/// A point in normalized detector space (unit square, bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in normalized detector space.
///
/// `origin` is the corner with the smallest `x` and `y`, which in the
/// bottom-left convention is the visually lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub origin: NormalizedPoint,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: NormalizedPoint::new(x, y),
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.height
    }

    /// True when the rectangle covers no area.
    pub fn is_degenerate(&self) -> bool {
        self.width.abs() <= GEOMETRY_EPSILON || self.height.abs() <= GEOMETRY_EPSILON
    }

    /// Resolve a point expressed relative to this rectangle (normalized within
    /// the box) into an absolute normalized position.
    pub fn absolute_point(&self, relative: NormalizedPoint) -> NormalizedPoint {
        NormalizedPoint::new(
            self.origin.x + relative.x * self.width,
            self.origin.y + relative.y * self.height,
        )
    }

    /// Smallest rectangle containing all `points`, or `None` for an empty slice.
    pub fn bounding(points: &[NormalizedPoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

// ---------------------------------------------------------------------------
// Display space
// ---------------------------------------------------------------------------

/// A point on the display surface (pixels, top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
}

impl DisplayPoint {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Arithmetic mean of a set of points, or `None` for an empty slice.
    pub fn centroid(points: &[DisplayPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Self::new(sx / n, sy / n))
    }
}

/// An axis-aligned rectangle on the display surface (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayRect {
    pub origin: DisplayPoint,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: DisplayPoint::new(x, y),
            width,
            height,
        }
    }

    /// Smallest rectangle containing all `points`, or `None` for an empty slice.
    pub fn bounding(points: &[DisplayPoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.height
    }
}

/// Width and height of a display surface or image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

// ---------------------------------------------------------------------------
// Affine transform
// ---------------------------------------------------------------------------

/// A 2D affine transform:
///
/// ```text
/// x' = a·x + b·y + tx
/// y' = c·x + d·y + ty
/// ```
///
/// Composition reads left to right: `first.then(second)` applies `first`,
/// then `second`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2 {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx,
            ty,
        }
    }

    /// `y → 1 − y` on the unit square (bottom-left ↔ top-left convention).
    pub const fn flip_unit_vertical() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: -1.0,
            tx: 0.0,
            ty: 1.0,
        }
    }

    /// `x → 1 − x` on the unit square (front-camera mirroring).
    pub const fn mirror_unit_horizontal() -> Self {
        Self {
            a: -1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 1.0,
            ty: 0.0,
        }
    }

    /// Rotate the unit square about its centre by `turns` quarter turns,
    /// clockwise as seen on a top-left-origin surface.
    pub fn quarter_turns_unit(turns: u8) -> Self {
        match turns % 4 {
            0 => Self::IDENTITY,
            // (u, v) → (1 − v, u)
            1 => Self {
                a: 0.0,
                b: -1.0,
                c: 1.0,
                d: 0.0,
                tx: 1.0,
                ty: 0.0,
            },
            // (u, v) → (1 − u, 1 − v)
            2 => Self {
                a: -1.0,
                b: 0.0,
                c: 0.0,
                d: -1.0,
                tx: 1.0,
                ty: 1.0,
            },
            // (u, v) → (v, 1 − u)
            _ => Self {
                a: 0.0,
                b: 1.0,
                c: -1.0,
                d: 0.0,
                tx: 0.0,
                ty: 1.0,
            },
        }
    }

    /// Compose: apply `self` first, then `next`.
    pub fn then(self, next: Affine2) -> Affine2 {
        Affine2 {
            a: next.a * self.a + next.b * self.c,
            b: next.a * self.b + next.b * self.d,
            c: next.c * self.a + next.d * self.c,
            d: next.c * self.b + next.d * self.d,
            tx: next.a * self.tx + next.b * self.ty + next.tx,
            ty: next.c * self.tx + next.d * self.ty + next.ty,
        }
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse transform, or `None` when the transform collapses an axis.
    pub fn inverse(&self) -> Option<Affine2> {
        let det = self.determinant();
        if det.abs() <= GEOMETRY_EPSILON {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Affine2 {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + b * self.ty),
            ty: -(c * self.tx + d * self.ty),
        })
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.tx,
            self.c * x + self.d * y + self.ty,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-9 && (actual.1 - expected.1).abs() < 1e-9,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn flip_maps_bottom_left_to_top_left() {
        let flip = Affine2::flip_unit_vertical();
        assert_close(flip.apply(0.0, 0.0), (0.0, 1.0));
        assert_close(flip.apply(0.25, 1.0), (0.25, 0.0));
    }

    #[test]
    fn four_quarter_turns_is_identity() {
        let t = Affine2::quarter_turns_unit(1);
        let full = t.then(t).then(t).then(t);
        assert_close(full.apply(0.3, 0.7), (0.3, 0.7));
        assert_eq!(Affine2::quarter_turns_unit(4), Affine2::IDENTITY);
    }

    #[test]
    fn quarter_turn_moves_top_left_to_top_right() {
        let t = Affine2::quarter_turns_unit(1);
        assert_close(t.apply(0.0, 0.0), (1.0, 0.0));
        assert_close(t.apply(1.0, 0.0), (1.0, 1.0));
    }

    #[test]
    fn then_applies_in_order() {
        let composed = Affine2::scale(2.0, 3.0).then(Affine2::translate(1.0, -1.0));
        assert_close(composed.apply(1.0, 1.0), (3.0, 2.0));
    }

    #[test]
    fn inverse_undoes_composition() {
        let t = Affine2::flip_unit_vertical()
            .then(Affine2::mirror_unit_horizontal())
            .then(Affine2::quarter_turns_unit(3))
            .then(Affine2::scale(640.0, 480.0));
        let inv = t.inverse().expect("invertible");
        let (x, y) = t.apply(0.12, 0.88);
        assert_close(inv.apply(x, y), (0.12, 0.88));
    }

    #[test]
    fn collapsed_scale_has_no_inverse() {
        assert!(Affine2::scale(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn absolute_point_resolves_within_box() {
        let rect = NormalizedRect::new(0.2, 0.4, 0.5, 0.25);
        let p = rect.absolute_point(NormalizedPoint::new(0.5, 1.0));
        assert!((p.x - 0.45).abs() < 1e-12);
        assert!((p.y - 0.65).abs() < 1e-12);
    }

    #[test]
    fn bounding_rect_of_points() {
        let pts = [
            DisplayPoint::new(10.0, 5.0),
            DisplayPoint::new(2.0, 9.0),
            DisplayPoint::new(6.0, 1.0),
        ];
        let rect = DisplayRect::bounding(&pts).expect("non-empty");
        assert_eq!(rect, DisplayRect::new(2.0, 1.0, 8.0, 8.0));
        assert!(DisplayRect::bounding(&[]).is_none());
    }
}
