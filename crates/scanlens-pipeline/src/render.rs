// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay styling and presentation.
//
// `draw_commands` turns overlay state into styled polylines. `present` pushes
// one store snapshot to a display surface. `ImageSurface` is a raster surface
// used by the command-line front end and tests.

use std::collections::BTreeMap;

use image::{GrayImage, Luma, Pixel, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut};
use imageproc::point::Point;
use scanlens_bridge::traits::DisplaySurface;
use scanlens_core::geometry::{DisplayPoint, DisplayRect};
use scanlens_core::types::{Mode, OverlayState};

use crate::overlay::OverlayStore;

// -- Styles -------------------------------------------------------------------

/// Stroke colour (alpha included) and width in display pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgba<u8>,
    pub width: f32,
}

pub const BARCODE_STROKE: Stroke = Stroke {
    color: Rgba([255, 0, 0, 255]),
    width: 2.0,
};

/// Gray 0.6 at alpha 0.6.
pub const DOCUMENT_STROKE: Stroke = Stroke {
    color: Rgba([153, 153, 153, 153]),
    width: 15.0,
};

pub const FACE_BOX_STROKE: Stroke = Stroke {
    color: Rgba([255, 0, 0, 255]),
    width: 2.0,
};

pub const LANDMARK_STROKE: Stroke = Stroke {
    color: Rgba([255, 255, 255, 255]),
    width: 2.0,
};

/// White at alpha 0.5, drawn under [`PITCH_STROKE`].
pub const PITCH_HALO_STROKE: Stroke = Stroke {
    color: Rgba([255, 255, 255, 128]),
    width: 17.5,
};

/// Green at alpha 0.8.
pub const PITCH_STROKE: Stroke = Stroke {
    color: Rgba([0, 255, 0, 204]),
    width: 15.0,
};

/// One polyline to stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub points: Vec<DisplayPoint>,
    pub closed: bool,
    pub stroke: Stroke,
}

fn rect_outline(rect: &DisplayRect, stroke: Stroke) -> DrawCommand {
    DrawCommand {
        points: vec![
            rect.origin,
            DisplayPoint::new(rect.max_x(), rect.origin.y),
            DisplayPoint::new(rect.max_x(), rect.max_y()),
            DisplayPoint::new(rect.origin.x, rect.max_y()),
        ],
        closed: true,
        stroke,
    }
}

/// Styled polylines for `state`, in paint order.
pub fn draw_commands(state: &OverlayState) -> Vec<DrawCommand> {
    match state {
        OverlayState::Empty => Vec::new(),
        OverlayState::Barcodes(barcodes) => barcodes
            .iter()
            .map(|barcode| rect_outline(&barcode.bounds, BARCODE_STROKE))
            .collect(),
        OverlayState::Documents(documents) => documents
            .iter()
            .map(|document| DrawCommand {
                points: document.outline.to_vec(),
                closed: true,
                stroke: DOCUMENT_STROKE,
            })
            .collect(),
        OverlayState::Face(face) => {
            let mut commands = vec![rect_outline(&face.bounds, FACE_BOX_STROKE)];
            commands.extend(
                face.landmarks
                    .iter()
                    .filter(|path| !path.points.is_empty())
                    .map(|path| DrawCommand {
                        points: path.points.clone(),
                        closed: path.closed,
                        stroke: LANDMARK_STROKE,
                    }),
            );
            commands
        }
        OverlayState::Pitch(pitch) if pitch.is_cleared() => Vec::new(),
        OverlayState::Pitch(pitch) => [PITCH_HALO_STROKE, PITCH_STROKE]
            .into_iter()
            .map(|stroke| DrawCommand {
                points: vec![pitch.origin, pitch.focus],
                closed: false,
                stroke,
            })
            .collect(),
    }
}

/// Push one snapshot of `store` to `surface`: draw every non-empty mode,
/// clear the rest.
pub fn present(store: &OverlayStore, surface: &mut dyn DisplaySurface) {
    let snapshot = store.snapshot();
    for (mode, state) in snapshot.iter() {
        if state.is_empty() {
            surface.clear_overlay(mode);
        } else {
            surface.draw_overlay(mode, state);
        }
    }
}

// -- Raster surface -----------------------------------------------------------

/// Display surface that composites overlay layers onto a background image.
#[derive(Debug, Clone)]
pub struct ImageSurface {
    background: RgbaImage,
    layers: BTreeMap<Mode, Vec<DrawCommand>>,
}

impl ImageSurface {
    pub fn new(background: RgbaImage) -> Self {
        Self {
            background,
            layers: BTreeMap::new(),
        }
    }

    /// Transparent surface of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::new(width, height))
    }

    /// Background with every layer stroked on top.
    pub fn render(&self) -> RgbaImage {
        let mut canvas = self.background.clone();
        for command in self.layers.values().flatten() {
            rasterize(&mut canvas, command);
        }
        canvas
    }
}

impl DisplaySurface for ImageSurface {
    fn draw_overlay(&mut self, mode: Mode, overlay: &OverlayState) {
        self.layers.insert(mode, draw_commands(overlay));
    }

    fn clear_overlay(&mut self, mode: Mode) {
        self.layers.remove(&mode);
    }
}

fn to_point(p: DisplayPoint) -> Point<i32> {
    Point::new(p.x.round() as i32, p.y.round() as i32)
}

/// Stroke `command` into a coverage mask, then blend its colour once per
/// covered pixel so overlapping segments do not darken joints.
fn rasterize(canvas: &mut RgbaImage, command: &DrawCommand) {
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 || command.points.is_empty() {
        return;
    }
    let half = f64::from(command.stroke.width) / 2.0;
    let radius = half.round().max(1.0) as i32;
    let mut mask = GrayImage::new(w, h);

    let mut segments: Vec<(DisplayPoint, DisplayPoint)> = command
        .points
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();
    if command.closed && command.points.len() > 2 {
        if let (Some(last), Some(first)) = (command.points.last(), command.points.first()) {
            segments.push((*last, *first));
        }
    }
    for (a, b) in segments {
        stroke_segment(&mut mask, a, b, half);
    }
    for point in &command.points {
        let centre = to_point(*point);
        draw_filled_circle_mut(&mut mask, (centre.x, centre.y), radius, Luma([255u8]));
    }

    for (x, y, coverage) in mask.enumerate_pixels() {
        if coverage[0] > 0 {
            canvas.get_pixel_mut(x, y).blend(&command.stroke.color);
        }
    }
}

fn stroke_segment(mask: &mut GrayImage, a: DisplayPoint, b: DisplayPoint, half: f64) {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = dx.hypot(dy);
    if len < 0.5 {
        return;
    }
    let (nx, ny) = (-dy / len * half, dx / len * half);
    let poly = [
        to_point(DisplayPoint::new(a.x + nx, a.y + ny)),
        to_point(DisplayPoint::new(b.x + nx, b.y + ny)),
        to_point(DisplayPoint::new(b.x - nx, b.y - ny)),
        to_point(DisplayPoint::new(a.x - nx, a.y - ny)),
    ];
    if poly[0] == poly[3] {
        return;
    }
    draw_polygon_mut(mask, &poly, Luma([255u8]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanlens_core::types::{BarcodeOverlay, Pitch};

    fn barcode_state() -> OverlayState {
        OverlayState::Barcodes(vec![BarcodeOverlay {
            bounds: DisplayRect::new(10.0, 10.0, 50.0, 20.0),
            payload: "x".into(),
        }])
    }

    #[derive(Default)]
    struct RecordingSurface {
        drawn: Vec<Mode>,
        cleared: Vec<Mode>,
    }

    impl DisplaySurface for RecordingSurface {
        fn draw_overlay(&mut self, mode: Mode, _overlay: &OverlayState) {
            self.drawn.push(mode);
        }

        fn clear_overlay(&mut self, mode: Mode) {
            self.cleared.push(mode);
        }
    }

    #[test]
    fn barcode_box_is_a_red_closed_outline() {
        let commands = draw_commands(&barcode_state());
        assert_eq!(commands.len(), 1);
        assert!(commands[0].closed);
        assert_eq!(commands[0].points.len(), 4);
        assert_eq!(commands[0].stroke, BARCODE_STROKE);
    }

    #[test]
    fn pitch_draws_halo_then_segment() {
        let pitch = Pitch {
            origin: DisplayPoint::new(50.0, 50.0),
            focus: DisplayPoint::new(50.0, -500.0),
        };
        let commands = draw_commands(&OverlayState::Pitch(pitch));
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].stroke, PITCH_HALO_STROKE);
        assert_eq!(commands[1].stroke, PITCH_STROKE);
        assert!(draw_commands(&OverlayState::Pitch(Pitch::cleared())).is_empty());
    }

    #[test]
    fn present_draws_active_and_clears_the_rest() {
        let store = OverlayStore::new(Mode::Barcode);
        store.set(Mode::Barcode, barcode_state());
        let mut surface = RecordingSurface::default();
        present(&store, &mut surface);
        assert_eq!(surface.drawn, vec![Mode::Barcode]);
        assert_eq!(surface.cleared.len(), Mode::ALL.len() - 1);
    }

    #[test]
    fn image_surface_strokes_outline_only() {
        let mut surface = ImageSurface::blank(100, 100);
        surface.draw_overlay(Mode::Barcode, &barcode_state());
        let image = surface.render();
        assert_eq!(*image.get_pixel(10, 20), Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(35, 20)[3], 0);

        surface.clear_overlay(Mode::Barcode);
        assert_eq!(surface.render().get_pixel(10, 20)[3], 0);
    }

    #[test]
    fn offscreen_focus_does_not_panic() {
        let mut surface = ImageSurface::blank(64, 64);
        surface.draw_overlay(
            Mode::FacePitch,
            &OverlayState::Pitch(Pitch {
                origin: DisplayPoint::new(32.0, 32.0),
                focus: DisplayPoint::new(32.0, 1500.0),
            }),
        );
        let image = surface.render();
        assert!(image.get_pixel(32, 40)[3] > 0);
    }
}
