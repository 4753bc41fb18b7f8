// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Finalized scan records handed to the result sink.

use chrono::{DateTime, Utc};
use image::DynamicImage;
use scanlens_core::types::{ScanId, ScanKind};
use sha2::{Digest, Sha256};

/// Headline used until recognized text provides a better one.
pub const DEFAULT_HEADLINE: &str = "Scanned Item";
/// Content used when no text was recognized.
pub const DEFAULT_CONTENT: &str = "Could not scan this document";

/// Shortest recognized line that may become a headline.
const MIN_HEADLINE_CHARS: usize = 3;

/// A captured or rectified image plus whatever text was read from it.
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub id: ScanId,
    pub kind: ScanKind,
    pub headline: String,
    pub content: String,
    pub image: DynamicImage,
    /// SHA-256 of the raw pixel bytes, hex-encoded.
    pub image_sha256: String,
    pub created_at: DateTime<Utc>,
}

impl ScanRecord {
    pub fn new(kind: ScanKind, image: DynamicImage) -> Self {
        let image_sha256 = hex::encode(Sha256::digest(image.as_bytes()));
        Self {
            id: ScanId::new(),
            kind,
            headline: DEFAULT_HEADLINE.to_string(),
            content: DEFAULT_CONTENT.to_string(),
            image,
            image_sha256,
            created_at: Utc::now(),
        }
    }

    /// Fill headline and content from recognized lines.
    ///
    /// Content is every line joined by a single space. The headline is the
    /// last line of at least three characters; an empty slice keeps the
    /// defaults.
    pub fn with_recognized_text(mut self, lines: &[String]) -> Self {
        if lines.is_empty() {
            return self;
        }
        if let Some(headline) = lines
            .iter()
            .rev()
            .find(|line| line.chars().count() >= MIN_HEADLINE_CHARS)
        {
            self.headline = headline.clone();
        }
        self.content = lines.join(" ");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn blank() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::new(4, 4))
    }

    #[test]
    fn new_record_uses_defaults() {
        let record = ScanRecord::new(ScanKind::Photo, blank());
        assert_eq!(record.headline, DEFAULT_HEADLINE);
        assert_eq!(record.content, DEFAULT_CONTENT);
        assert_eq!(record.image_sha256.len(), 64);
    }

    #[test]
    fn headline_is_last_line_long_enough() {
        let lines = vec!["Invoice".to_string(), "No 42".to_string(), "ok".to_string()];
        let record = ScanRecord::new(ScanKind::Rectified, blank()).with_recognized_text(&lines);
        assert_eq!(record.headline, "No 42");
        assert_eq!(record.content, "Invoice No 42 ok");
    }

    #[test]
    fn short_lines_keep_default_headline() {
        let lines = vec!["a".to_string(), "bc".to_string()];
        let record = ScanRecord::new(ScanKind::Photo, blank()).with_recognized_text(&lines);
        assert_eq!(record.headline, DEFAULT_HEADLINE);
        assert_eq!(record.content, "a bc");
    }

    #[test]
    fn identical_pixels_hash_identically() {
        let a = ScanRecord::new(ScanKind::Photo, blank());
        let b = ScanRecord::new(ScanKind::Photo, blank());
        assert_eq!(a.image_sha256, b.image_sha256);
        assert_ne!(a.id, b.id);
    }
}
