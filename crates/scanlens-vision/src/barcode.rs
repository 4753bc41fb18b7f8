// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Barcode reading with the rxing decoder.
//
// Used as the stateless barcode backend on desktop builds, where no native
// vision framework is available.

use image::DynamicImage;
use rxing::helpers::detect_in_luma;
use scanlens_bridge::traits::StatelessDetector;
use scanlens_core::error::Result;
use scanlens_core::geometry::{NormalizedPoint, NormalizedRect};
use scanlens_core::types::{BarcodeDetection, Detection, DeviceOrientation};
use tracing::{debug, instrument};

/// Confidence reported for every decoded code.
///
/// rxing only returns a result once the symbol's checksum or error
/// correction has verified it, and gives no score of its own.
pub const DECODED_CONFIDENCE: f32 = 1.0;

/// Smallest box side, as a fraction of the frame. Linear codes report their
/// result points along a single scan row.
const MIN_EXTENT: f64 = 0.02;

/// Decodes at most one barcode per frame (QR, Data Matrix, Aztec, PDF417
/// and the common linear symbologies).
///
/// `bounds` is the box around the decoder's result points, so for 2D codes
/// it spans the finder patterns rather than the full quiet zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxingBarcodeDetector;

impl RxingBarcodeDetector {
    pub fn new() -> Self {
        Self
    }
}

impl StatelessDetector for RxingBarcodeDetector {
    fn name(&self) -> &str {
        "rxing-barcode"
    }

    #[instrument(skip_all, fields(width = pixels.width(), height = pixels.height()))]
    fn detect(
        &self,
        pixels: &DynamicImage,
        _orientation: DeviceOrientation,
    ) -> Result<Vec<Detection>> {
        let (w, h) = (pixels.width(), pixels.height());
        if w == 0 || h == 0 {
            return Ok(Vec::new());
        }
        let luma = pixels.to_luma8().into_raw();
        let decoded = match detect_in_luma(luma, w, h, None) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(%err, "no barcode in frame");
                return Ok(Vec::new());
            }
        };

        let (fw, fh) = (f64::from(w), f64::from(h));
        let points: Vec<NormalizedPoint> = decoded
            .getPoints()
            .iter()
            .map(|p| {
                NormalizedPoint::new(
                    (f64::from(p.x) / fw).clamp(0.0, 1.0),
                    (1.0 - f64::from(p.y) / fh).clamp(0.0, 1.0),
                )
            })
            .collect();
        let Some(bounds) = NormalizedRect::bounding(&points).map(widen) else {
            debug!("decoded barcode without result points");
            return Ok(Vec::new());
        };

        let payload = decoded.getText().to_string();
        debug!(format = ?decoded.getBarcodeFormat(), %payload, "Barcode decoded");
        Ok(vec![Detection::Barcode(BarcodeDetection {
            bounds,
            confidence: DECODED_CONFIDENCE,
            payload,
        })])
    }
}

/// Grow each side to at least [`MIN_EXTENT`] around its centre, staying in
/// the unit square.
fn widen(rect: NormalizedRect) -> NormalizedRect {
    let grow = |start: f64, len: f64| {
        if len >= MIN_EXTENT {
            return (start, len);
        }
        let lo = (start + len / 2.0 - MIN_EXTENT / 2.0).clamp(0.0, 1.0 - MIN_EXTENT);
        (lo, MIN_EXTENT)
    };
    let (x, width) = grow(rect.origin.x, rect.width);
    let (y, height) = grow(rect.origin.y, rect.height);
    NormalizedRect::new(x, y, width, height)
}
