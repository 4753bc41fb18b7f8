// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory scan history.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scanlens_bridge::record::ScanRecord;
use scanlens_bridge::traits::ResultSink;
use scanlens_core::error::Result;
use scanlens_core::types::ScanId;
use tracing::info;

/// Result sink that keeps every submitted record, oldest first.
///
/// Cheap to clone; clones share the same history.
#[derive(Clone, Default)]
pub struct ScanRepository {
    records: Arc<Mutex<Vec<ScanRecord>>>,
}

impl ScanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Vec<ScanRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn latest(&self) -> Option<ScanRecord> {
        self.records().last().cloned()
    }

    pub fn get(&self, id: ScanId) -> Option<ScanRecord> {
        self.records().iter().find(|record| record.id == id).cloned()
    }
}

impl ResultSink for ScanRepository {
    fn submit(&self, record: ScanRecord) -> Result<()> {
        info!(id = %record.id, kind = ?record.kind, headline = %record.headline, "Scan stored");
        self.records().push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use scanlens_core::types::ScanKind;

    #[test]
    fn keeps_records_in_submission_order() {
        let repo = ScanRepository::new();
        let shared = repo.clone();
        let first = ScanRecord::new(ScanKind::Photo, DynamicImage::ImageRgb8(RgbImage::new(2, 2)));
        let second =
            ScanRecord::new(ScanKind::Rectified, DynamicImage::ImageRgb8(RgbImage::new(3, 3)));
        let first_id = first.id;

        repo.submit(first).expect("submit");
        shared.submit(second).expect("submit");

        assert_eq!(repo.len(), 2);
        assert_eq!(repo.latest().map(|r| r.kind), Some(ScanKind::Rectified));
        assert_eq!(repo.get(first_id).map(|r| r.kind), Some(ScanKind::Photo));
    }
}
