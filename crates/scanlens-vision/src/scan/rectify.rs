// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One-shot perspective rectification of a detected document quadrilateral.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use scanlens_core::config::RectifyLimits;
use scanlens_core::types::QuadCorners;
use tracing::{debug, info, instrument, warn};

/// Cross products at or below this (in px²) count as collinear.
const COLLINEAR_EPSILON: f64 = 1e-6;

/// Smallest quad area worth warping, in px².
const MIN_AREA_PX: f64 = 1.0;

/// Output of a rectification. Zero-sized when the input quad was unusable.
#[derive(Debug, Clone)]
pub struct RectifiedDocument {
    pub image: DynamicImage,
}

impl RectifiedDocument {
    pub fn empty() -> Self {
        Self {
            image: DynamicImage::ImageRgba8(RgbaImage::new(0, 0)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// Warps the quad inside a still image onto an axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerspectiveRectifier {
    limits: RectifyLimits,
}

impl PerspectiveRectifier {
    pub fn new(limits: RectifyLimits) -> Self {
        Self { limits }
    }

    /// Rectify the region bounded by `corners` (normalized, bottom-left
    /// origin) in `source`.
    ///
    /// The output is as wide as the longer of the top and bottom edges and as
    /// tall as the longer of the left and right edges. Collinear, non-convex
    /// or sub-pixel quads, and outputs beyond the configured limit, produce
    /// [`RectifiedDocument::empty`].
    #[instrument(skip_all, fields(width = source.width(), height = source.height()))]
    pub fn rectify(&self, corners: &QuadCorners, source: &DynamicImage) -> RectifiedDocument {
        let (src_w, src_h) = (source.width(), source.height());
        if src_w == 0 || src_h == 0 {
            warn!("Source image is empty; nothing to rectify");
            return RectifiedDocument::empty();
        }

        // Clockwise on screen: top-left, top-right, bottom-right, bottom-left.
        let quad = [
            corners.top_left,
            corners.top_right,
            corners.bottom_right,
            corners.bottom_left,
        ]
        .map(|p| (p.x * src_w as f64, (1.0 - p.y) * src_h as f64));

        if quad.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            warn!("Corner coordinates are not finite");
            return RectifiedDocument::empty();
        }
        if has_collinear_triple(&quad) {
            warn!(?quad, "Three corners are collinear");
            return RectifiedDocument::empty();
        }
        if !is_convex(&quad) {
            warn!(?quad, "Quadrilateral is not convex");
            return RectifiedDocument::empty();
        }
        let area = shoelace_area(&quad);
        if area < MIN_AREA_PX {
            warn!(area, "Quadrilateral is smaller than one pixel");
            return RectifiedDocument::empty();
        }

        let [tl, tr, br, bl] = quad;
        let out_w = distance(tl, tr).max(distance(bl, br)).round();
        let out_h = distance(tl, bl).max(distance(tr, br)).round();
        let max_side = f64::from(self.limits.max_side);
        if out_w < 1.0 || out_h < 1.0 || out_w > max_side || out_h > max_side {
            warn!(out_w, out_h, max_side, "Rectified size out of range");
            return RectifiedDocument::empty();
        }
        let (out_w, out_h) = (out_w as u32, out_h as u32);

        let src = quad.map(|(x, y)| (x as f32, y as f32));
        let dest: [(f32, f32); 4] = [
            (0.0, 0.0),
            (out_w as f32, 0.0),
            (out_w as f32, out_h as f32),
            (0.0, out_h as f32),
        ];
        let Some(projection) = Projection::from_control_points(src, dest) else {
            warn!("Homography could not be solved");
            return RectifiedDocument::empty();
        };

        let rgba = source.to_rgba8();
        let mut output = RgbaImage::new(out_w, out_h);
        warp_into(
            &rgba,
            &projection,
            Interpolation::Bilinear,
            Rgba([255u8, 255, 255, 255]),
            &mut output,
        );

        info!(out_w, out_h, "Document rectified");
        RectifiedDocument {
            image: DynamicImage::ImageRgba8(output),
        }
    }
}

// -- Quad checks --------------------------------------------------------------

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

fn has_collinear_triple(quad: &[(f64, f64); 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES
        .iter()
        .any(|[i, j, k]| cross(quad[*i], quad[*j], quad[*k]).abs() <= COLLINEAR_EPSILON)
}

/// Every turn along the outline has the same sign. Rules out both concave
/// and self-intersecting (bow-tie) quads.
fn is_convex(quad: &[(f64, f64); 4]) -> bool {
    let turns: Vec<f64> = (0..4)
        .map(|i| cross(quad[i], quad[(i + 1) % 4], quad[(i + 2) % 4]))
        .collect();
    debug!(?turns, "quad turns");
    turns.iter().all(|t| *t > 0.0) || turns.iter().all(|t| *t < 0.0)
}

fn shoelace_area(quad: &[(f64, f64); 4]) -> f64 {
    let mut twice = 0.0;
    for i in 0..4 {
        let j = (i + 1) % 4;
        twice += quad[i].0 * quad[j].1 - quad[j].0 * quad[i].1;
    }
    twice.abs() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanlens_core::geometry::{NormalizedPoint, NormalizedRect};

    fn page(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([20, 20, 20, 255]));
        for y in height / 4..height * 3 / 4 {
            for x in width / 4..width * 3 / 4 {
                img.put_pixel(x, y, Rgba([240, 240, 240, 255]));
            }
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn axis_aligned_quad_keeps_its_size() {
        let corners = QuadCorners::from_rect(&NormalizedRect::new(0.25, 0.25, 0.5, 0.5));
        let doc = PerspectiveRectifier::default().rectify(&corners, &page(200, 400));
        assert_eq!((doc.width(), doc.height()), (100, 200));
        let centre = doc.image.to_rgba8().get_pixel(50, 100).0;
        assert!(centre[0] > 200, "expected the light page, got {centre:?}");
    }

    #[test]
    fn skewed_quad_uses_longest_edges() {
        let corners = QuadCorners {
            top_left: NormalizedPoint::new(0.25, 0.75),
            top_right: NormalizedPoint::new(0.75, 0.75),
            bottom_left: NormalizedPoint::new(0.125, 0.25),
            bottom_right: NormalizedPoint::new(0.875, 0.25),
        };
        let doc = PerspectiveRectifier::default().rectify(&corners, &page(400, 400));
        assert_eq!(doc.width(), 300);
        assert!(!doc.is_empty());
    }

    #[test]
    fn collinear_corners_yield_empty() {
        let corners = QuadCorners {
            top_left: NormalizedPoint::new(0.0, 0.5),
            top_right: NormalizedPoint::new(0.5, 0.5),
            bottom_left: NormalizedPoint::new(0.25, 0.0),
            bottom_right: NormalizedPoint::new(1.0, 0.5),
        };
        let doc = PerspectiveRectifier::default().rectify(&corners, &page(100, 100));
        assert!(doc.is_empty());
    }

    #[test]
    fn bow_tie_yields_empty() {
        let corners = QuadCorners {
            top_left: NormalizedPoint::new(0.25, 0.75),
            top_right: NormalizedPoint::new(0.75, 0.75),
            bottom_left: NormalizedPoint::new(0.75, 0.25),
            bottom_right: NormalizedPoint::new(0.25, 0.25),
        };
        let doc = PerspectiveRectifier::default().rectify(&corners, &page(100, 100));
        assert!(doc.is_empty());
    }

    #[test]
    fn tiny_quad_yields_empty() {
        let corners = QuadCorners::from_rect(&NormalizedRect::new(0.5, 0.5, 0.001, 0.001));
        let doc = PerspectiveRectifier::default().rectify(&corners, &page(100, 100));
        assert!(doc.is_empty());
    }

    #[test]
    fn oversized_output_yields_empty() {
        let rectifier = PerspectiveRectifier::new(RectifyLimits { max_side: 32 });
        let corners = QuadCorners::from_rect(&NormalizedRect::new(0.0, 0.0, 1.0, 1.0));
        assert!(rectifier.rectify(&corners, &page(100, 100)).is_empty());
    }

    #[test]
    fn empty_source_yields_empty() {
        let corners = QuadCorners::from_rect(&NormalizedRect::new(0.25, 0.25, 0.5, 0.5));
        let source = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        assert!(PerspectiveRectifier::default().rectify(&corners, &source).is_empty());
    }
}
