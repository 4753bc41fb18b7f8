// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable notifications for pipeline errors.
//
// Per-frame failures never stop the camera, but the user still deserves to
// know why the overlay vanished. Every technical error maps to plain English
// with a suggestion, and a severity that drives how the UI shows it.

use crate::error::ScanlensError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A single frame or capture went wrong; the next one will likely work.
    Transient,
    /// User must do something (grant camera access, close another camera app).
    ActionRequired,
    /// Cannot be fixed by retrying or user action on this device.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone, PartialEq)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether the pipeline recovers on its own.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `ScanlensError` into a `HumanError`.
pub fn humanize_error(err: &ScanlensError) -> HumanError {
    match err {
        ScanlensError::Configuration(detail) => {
            let lower = detail.to_lowercase();
            if lower.contains("permission") || lower.contains("denied") {
                HumanError {
                    message: "We don't have permission to use the camera.".into(),
                    suggestion: "Allow camera access in your device settings, then open the scanner again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if lower.contains("busy") || lower.contains("in use") {
                HumanError {
                    message: "The camera is being used by another app.".into(),
                    suggestion: "Close other apps that use the camera, then try again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "The camera couldn't be started.".into(),
                    suggestion: format!("Try closing and reopening the scanner. ({detail})"),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            }
        }

        ScanlensError::InvalidConfig(detail) => HumanError {
            message: "The scanner settings aren't valid.".into(),
            suggestion: format!("Reset the settings to their defaults. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanlensError::Detector(detail) => HumanError {
            message: "We lost track of what the camera is looking at.".into(),
            suggestion: format!("Hold the device steady. Detection resumes on the next frame. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanlensError::Capture(detail) => HumanError {
            message: "The photo couldn't be taken.".into(),
            suggestion: format!("Tap the shutter again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanlensError::ImageError(detail) => HumanError {
            message: "The photo couldn't be processed.".into(),
            suggestion: format!("Try taking the photo again with better lighting. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanlensError::OcrError(_) => HumanError {
            message: "We couldn't read the text in this scan.".into(),
            suggestion: "The image was saved. Try again with the document flat and well lit to read its text.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanlensError::AlreadyRunning => HumanError {
            message: "The scanner is already running.".into(),
            suggestion: "Nothing to do, the camera is live.".into(),
            retriable: false,
            severity: Severity::Transient,
        },

        ScanlensError::Io(err) => HumanError {
            message: "A file couldn't be read or written.".into(),
            suggestion: format!("Check that the device has free storage. ({err})"),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanlensError::Serialization(_) => HumanError {
            message: "Saved settings are damaged.".into(),
            suggestion: "The scanner will use default settings.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanlensError::Bridge(detail) => HumanError {
            message: "Something went wrong talking to the device.".into(),
            suggestion: format!("Try again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanlensError::PlatformUnavailable => HumanError {
            message: "This device has no supported camera.".into(),
            suggestion: "Open a saved photo instead of using the live camera.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_failure_is_transient() {
        let human = humanize_error(&ScanlensError::Detector("vision request failed".into()));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn permission_denied_needs_user_action() {
        let err = ScanlensError::Configuration("camera permission denied".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn missing_camera_is_permanent() {
        let human = humanize_error(&ScanlensError::PlatformUnavailable);
        assert_eq!(human.severity, Severity::Permanent);
    }
}
