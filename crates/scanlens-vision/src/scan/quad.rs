// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document rectangle detection with edge detection and the Hough transform.
//
// Used as the stateless rectangle backend on desktop builds, where no native
// vision framework is available.

use image::DynamicImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use scanlens_bridge::traits::StatelessDetector;
use scanlens_core::error::Result;
use scanlens_core::geometry::NormalizedPoint;
use scanlens_core::types::{Detection, DeviceOrientation, QuadCorners, RectangleDetection};
use tracing::{debug, instrument};

/// Quads covering less than this share of the frame are ignored.
const MIN_AREA_FRACTION: f64 = 0.10;

/// Finds the dominant document-like quadrilateral in a frame.
///
/// ## Pipeline
///
/// 1. Grayscale, Gaussian blur (sigma 2.0), Canny edges
/// 2. Hough lines, vote threshold scaled to the image diagonal
/// 3. Split into near-horizontal and near-vertical lines
/// 4. Outermost line on each side becomes a document edge
/// 5. Edge intersections become the corners
///
/// Confidence is a rectangularity score: one minus the mean deviation of the
/// corner angles from 90°, divided by 90°.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughRectangleDetector {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub suppression_radius: u32,
}

impl Default for HoughRectangleDetector {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            canny_low: 50.0,
            canny_high: 150.0,
            suppression_radius: 8,
        }
    }
}

impl HoughRectangleDetector {
    /// Detect the quad in pixel space, returning `[tl, tr, br, bl]` with a
    /// top-left origin, or `None` when no clean quad is found.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn find_quad(&self, image: &DynamicImage) -> Option<[(f64, f64); 4]> {
        let (w, h) = (image.width(), image.height());
        if w == 0 || h == 0 {
            return None;
        }

        let gray = image.to_luma8();
        let blurred = gaussian_blur_f32(&gray, self.blur_sigma);
        let edges = canny(&blurred, self.canny_low, self.canny_high);

        let diagonal = (f64::from(w).powi(2) + f64::from(h).powi(2)).sqrt();
        let vote_threshold = (diagonal * 0.25).max(80.0) as u32;
        let lines = detect_lines(
            &edges,
            LineDetectionOptions {
                vote_threshold,
                suppression_radius: self.suppression_radius,
            },
        );
        debug!(line_count = lines.len(), vote_threshold, "Hough lines detected");

        let (horizontal, vertical) = classify_lines(&lines);
        if horizontal.len() < 2 || vertical.len() < 2 {
            debug!(
                horizontal = horizontal.len(),
                vertical = vertical.len(),
                "Not enough edges for a quad"
            );
            return None;
        }

        let (cx, cy) = (f64::from(w) / 2.0, f64::from(h) / 2.0);
        let top = extreme_by(&horizontal, |l| horizontal_intercept(l, cx), false)?;
        let bottom = extreme_by(&horizontal, |l| horizontal_intercept(l, cx), true)?;
        let left = extreme_by(&vertical, |l| vertical_intercept(l, cy), false)?;
        let right = extreme_by(&vertical, |l| vertical_intercept(l, cy), true)?;

        let corners = [
            intersect_polar_lines(&top, &left)?,
            intersect_polar_lines(&top, &right)?,
            intersect_polar_lines(&bottom, &right)?,
            intersect_polar_lines(&bottom, &left)?,
        ];

        let area = shoelace_area(&corners);
        let min_area = f64::from(w) * f64::from(h) * MIN_AREA_FRACTION;
        if area < min_area {
            debug!(area, min_area, "Quad too small");
            return None;
        }
        Some(corners)
    }
}

impl StatelessDetector for HoughRectangleDetector {
    fn name(&self) -> &str {
        "hough-rectangle"
    }

    fn detect(
        &self,
        pixels: &DynamicImage,
        orientation: DeviceOrientation,
    ) -> Result<Vec<Detection>> {
        let Some(quad) = self.find_quad(pixels) else {
            return Ok(Vec::new());
        };
        let (w, h) = (f64::from(pixels.width()), f64::from(pixels.height()));
        let to_normalized = |(x, y): (f64, f64)| {
            NormalizedPoint::new((x / w).clamp(0.0, 1.0), (1.0 - y / h).clamp(0.0, 1.0))
        };
        let corners = QuadCorners {
            top_left: to_normalized(quad[0]),
            top_right: to_normalized(quad[1]),
            bottom_right: to_normalized(quad[2]),
            bottom_left: to_normalized(quad[3]),
        };
        let confidence = rectangularity(&quad);
        debug!(confidence, ?orientation, "Rectangle detected");
        Ok(vec![Detection::Rectangle(RectangleDetection::from_corners(
            corners, confidence,
        ))])
    }
}

// -- Line helpers -------------------------------------------------------------

/// Split lines into near-horizontal and near-vertical sets.
///
/// A `PolarLine` satisfies `x·cos θ + y·sin θ = r`, so θ near 90° is a
/// horizontal line and θ near 0° or 180° a vertical one. Lines within 30° of
/// either are kept; diagonals are dropped.
fn classify_lines(lines: &[PolarLine]) -> (Vec<PolarLine>, Vec<PolarLine>) {
    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    for line in lines {
        let angle = line.angle_in_degrees;
        if (60..=120).contains(&angle) {
            horizontal.push(*line);
        } else if angle <= 30 || angle >= 150 {
            vertical.push(*line);
        }
    }
    (horizontal, vertical)
}

/// y where a horizontal-ish line crosses `x`.
fn horizontal_intercept(line: &PolarLine, x: f64) -> f64 {
    let theta = f64::from(line.angle_in_degrees).to_radians();
    (f64::from(line.r) - x * theta.cos()) / theta.sin()
}

/// x where a vertical-ish line crosses `y`.
fn vertical_intercept(line: &PolarLine, y: f64) -> f64 {
    let theta = f64::from(line.angle_in_degrees).to_radians();
    (f64::from(line.r) - y * theta.sin()) / theta.cos()
}

fn extreme_by(
    lines: &[PolarLine],
    key: impl Fn(&PolarLine) -> f64,
    largest: bool,
) -> Option<PolarLine> {
    let cmp = |a: &&PolarLine, b: &&PolarLine| key(*a).total_cmp(&key(*b));
    let found = if largest {
        lines.iter().max_by(cmp)
    } else {
        lines.iter().min_by(cmp)
    };
    found.copied()
}

/// Intersection of two lines in Hough form; `None` when nearly parallel.
fn intersect_polar_lines(a: &PolarLine, b: &PolarLine) -> Option<(f64, f64)> {
    let theta_a = f64::from(a.angle_in_degrees).to_radians();
    let theta_b = f64::from(b.angle_in_degrees).to_radians();
    let (sin_a, cos_a) = theta_a.sin_cos();
    let (sin_b, cos_b) = theta_b.sin_cos();

    let denom = cos_a * sin_b - sin_a * cos_b;
    if denom.abs() < 1e-6 {
        return None;
    }
    let (r_a, r_b) = (f64::from(a.r), f64::from(b.r));
    Some((
        (r_a * sin_b - r_b * sin_a) / denom,
        (r_b * cos_a - r_a * cos_b) / denom,
    ))
}

fn shoelace_area(corners: &[(f64, f64); 4]) -> f64 {
    let mut twice = 0.0;
    for i in 0..4 {
        let j = (i + 1) % 4;
        twice += corners[i].0 * corners[j].1 - corners[j].0 * corners[i].1;
    }
    twice.abs() / 2.0
}

/// 1.0 for a perfect rectangle, falling linearly with the mean corner-angle
/// error.
fn rectangularity(corners: &[(f64, f64); 4]) -> f32 {
    let mut deviation = 0.0;
    for i in 0..4 {
        let prev = corners[(i + 3) % 4];
        let here = corners[i];
        let next = corners[(i + 1) % 4];
        let u = (prev.0 - here.0, prev.1 - here.1);
        let v = (next.0 - here.0, next.1 - here.1);
        let norms = (u.0.hypot(u.1)) * (v.0.hypot(v.1));
        if norms <= f64::EPSILON {
            return 0.0;
        }
        let cos = ((u.0 * v.0 + u.1 * v.1) / norms).clamp(-1.0, 1.0);
        deviation += (cos.acos().to_degrees() - 90.0).abs();
    }
    (1.0 - deviation / 4.0 / 90.0).clamp(0.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn blank_image_has_no_rectangle() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 300, Luma([200u8])));
        let found = HoughRectangleDetector::default()
            .detect(&img, DeviceOrientation::Portrait)
            .expect("detect");
        assert!(found.is_empty());
    }

    #[test]
    fn empty_image_has_no_rectangle() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        assert!(HoughRectangleDetector::default().find_quad(&img).is_none());
    }

    #[test]
    fn perpendicular_lines_intersect() {
        // y = 100 and x = 50
        let h = PolarLine {
            r: 100.0,
            angle_in_degrees: 90,
        };
        let v = PolarLine {
            r: 50.0,
            angle_in_degrees: 0,
        };
        let (x, y) = intersect_polar_lines(&h, &v).expect("should intersect");
        assert!((x - 50.0).abs() < 1e-6 && (y - 100.0).abs() < 1e-6);
    }

    #[test]
    fn parallel_lines_do_not_intersect() {
        let a = PolarLine {
            r: 50.0,
            angle_in_degrees: 0,
        };
        let b = PolarLine {
            r: 100.0,
            angle_in_degrees: 0,
        };
        assert!(intersect_polar_lines(&a, &b).is_none());
    }

    #[test]
    fn lines_split_by_orientation() {
        let lines = vec![
            PolarLine { r: 10.0, angle_in_degrees: 90 },
            PolarLine { r: 20.0, angle_in_degrees: 85 },
            PolarLine { r: 30.0, angle_in_degrees: 0 },
            PolarLine { r: -40.0, angle_in_degrees: 175 },
            PolarLine { r: 50.0, angle_in_degrees: 45 },
        ];
        let (horizontal, vertical) = classify_lines(&lines);
        assert_eq!(horizontal.len(), 2);
        assert_eq!(vertical.len(), 2);
    }

    #[test]
    fn intercepts_order_edges() {
        let near = PolarLine { r: 20.0, angle_in_degrees: 0 };
        let far = PolarLine { r: -180.0, angle_in_degrees: 179 };
        let left = extreme_by(&[near, far], |l| vertical_intercept(l, 50.0), false)
            .expect("non-empty");
        assert_eq!(left.r, 20.0);
        assert!(extreme_by(&[], |l| vertical_intercept(l, 0.0), true).is_none());
    }

    #[test]
    fn square_is_fully_rectangular() {
        let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        assert!((rectangularity(&square) - 1.0).abs() < 1e-6);
        let skewed = [(0.0, 0.0), (10.0, 0.0), (14.0, 10.0), (4.0, 10.0)];
        assert!(rectangularity(&skewed) < 0.9);
        assert!((shoelace_area(&square) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn finds_a_bright_page_on_dark_background() {
        let (w, h) = (400u32, 500u32);
        let mut img = GrayImage::from_pixel(w, h, Luma([30u8]));
        for y in 60..440 {
            for x in 50..350 {
                img.put_pixel(x, y, Luma([240u8]));
            }
        }
        let detections = HoughRectangleDetector::default()
            .detect(&DynamicImage::ImageLuma8(img), DeviceOrientation::Portrait)
            .expect("detect");
        let Some(Detection::Rectangle(rect)) = detections.first() else {
            panic!("expected a rectangle, got {detections:?}");
        };
        assert!(rect.confidence > 0.95, "confidence {}", rect.confidence);
        assert!((rect.corners.top_left.x - 50.0 / 400.0).abs() < 0.03);
        assert!((rect.corners.top_left.y - (1.0 - 60.0 / 500.0)).abs() < 0.03);
        assert!((rect.corners.bottom_right.x - 350.0 / 400.0).abs() < 0.03);
    }
}
