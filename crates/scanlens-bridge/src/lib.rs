// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Scanlens collaborator interfaces.
//!
//! The pipeline core never talks to camera hardware, vision frameworks, or UI
//! toolkits directly. This crate defines the traits it consumes (frame
//! source, detector backends, still capture, text recognition) and exposes
//! (display surface, result sink), plus two desktop implementations: a stub
//! camera that reports the platform as unavailable, and a replay camera that
//! feeds a still image through the pipeline.

pub mod record;
pub mod replay;
pub mod stub;
pub mod traits;

pub use record::ScanRecord;
pub use replay::ReplayCamera;
pub use traits::*;

/// Retrieves the camera bridge for the target operating system.
///
/// Native camera bridges are provided by the host application; builds without
/// one get the stub, whose frame source fails at start-up.
pub fn platform_camera() -> Box<dyn traits::CameraBridge> {
    Box::new(stub::StubCamera)
}
