// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanlens.

use thiserror::Error;

/// Top-level error type for all Scanlens operations.
#[derive(Debug, Error)]
pub enum ScanlensError {
    // -- Startup --
    #[error("camera configuration failed: {0}")]
    Configuration(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Per-frame --
    #[error("detector failed: {0}")]
    Detector(String),

    // -- Capture path --
    #[error("still capture failed: {0}")]
    Capture(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("pipeline is already running")]
    AlreadyRunning,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanlensError>;
