// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable messages for rejected uploads and internal faults.
//
// Rejection messages are what the person uploading a product photo sees, so
// they name the upload slot and say what to do next.

use crate::config::AdmissionConfig;
use crate::error::GateError;
use crate::types::{ImageKind, RejectionReason};

/// Severity of an error from the caller's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Storage hiccup; retrying may help.
    Transient,
    /// The operator must fix something (bad config, missing file).
    ActionRequired,
    /// Retrying will not help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    pub retriable: bool,
    pub severity: Severity,
}

/// Message shown to the uploader when `slot` is rejected.
pub fn rejection_message(
    slot: &str,
    reason: RejectionReason,
    mime_type: &str,
    config: &AdmissionConfig,
) -> String {
    match reason {
        RejectionReason::WrongFormat => format!(
            "Invalid file type for {slot}: {mime_type}. Only {} allowed.",
            allowed_formats_phrase(config)
        ),
        RejectionReason::TooBlurry => format!(
            "Image is too blurry: {slot}. Please upload a clearer, sharper image."
        ),
        RejectionReason::TooSmall => format!(
            "Image resolution too low for {slot}. Minimum {}x{}px required.",
            config.min_width, config.min_height
        ),
        RejectionReason::ProcessingFailed => {
            format!("Failed to process image: {slot}. File may be corrupted.")
        }
    }
}

/// "JPEG, PNG, WebP, and GIF" for the default allow-list.
fn allowed_formats_phrase(config: &AdmissionConfig) -> String {
    let names: Vec<String> = config
        .allowed_types
        .iter()
        .map(|mime| match ImageKind::from_mime(mime) {
            Some(kind) => kind.display_name().to_owned(),
            None => mime.clone(),
        })
        .collect();

    match names.as_slice() {
        [] => "no file types are".to_owned(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

/// Convert a `GateError` into a `HumanError` for operators.
pub fn humanize_error(err: &GateError) -> HumanError {
    match err {
        GateError::Decode(_) => HumanError {
            message: "The image could not be read.".into(),
            suggestion: "The file may be damaged. Open it in an image viewer to check, or export it again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        GateError::Encode(_) => HumanError {
            message: "The resized image could not be written.".into(),
            suggestion: "The original upload was kept. Check the log for the encoder error.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        GateError::Scoring(_) => HumanError {
            message: "Sharpness could not be measured.".into(),
            suggestion: "The image was not judged for blur. Nothing needs to be done.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        GateError::Evaluation(_) => HumanError {
            message: "An upload could not be checked.".into(),
            suggestion: "The upload was turned away. Submitting it again may work.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        GateError::Config(detail) => HumanError {
            message: "The admission settings are invalid.".into(),
            suggestion: format!("Fix the configuration file and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        GateError::Storage { location, .. } => HumanError {
            message: "An uploaded file could not be accessed.".into(),
            suggestion: format!("Check that {location} exists and is readable."),
            retriable: true,
            severity: Severity::Transient,
        },

        GateError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => HumanError {
                message: "A file could not be opened.".into(),
                suggestion: format!("Check the path and its permissions. ({io_err})"),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "Reading or writing a file failed.".into(),
                suggestion: format!("Try again in a moment. ({io_err})"),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        GateError::Serialization(err) => HumanError {
            message: "A settings file is not valid JSON.".into(),
            suggestion: format!("Fix the syntax error and try again. ({err})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_format_lists_default_types() {
        let msg = rejection_message(
            "thumbnail",
            RejectionReason::WrongFormat,
            "image/tiff",
            &AdmissionConfig::default(),
        );
        assert_eq!(
            msg,
            "Invalid file type for thumbnail: image/tiff. Only JPEG, PNG, WebP, and GIF allowed."
        );
    }

    #[test]
    fn wrong_format_with_two_types() {
        let config = AdmissionConfig {
            allowed_types: vec!["image/png".into(), "image/gif".into()],
            ..AdmissionConfig::default()
        };
        let msg = rejection_message("logo", RejectionReason::WrongFormat, "text/plain", &config);
        assert!(msg.ends_with("Only PNG and GIF allowed."), "{msg}");
    }

    #[test]
    fn too_small_names_configured_minimum() {
        let config = AdmissionConfig {
            min_width: 400,
            min_height: 300,
            ..AdmissionConfig::default()
        };
        let msg = rejection_message("gallery", RejectionReason::TooSmall, "image/png", &config);
        assert_eq!(msg, "Image resolution too low for gallery. Minimum 400x300px required.");
    }

    #[test]
    fn blurry_and_corrupt_messages_name_slot() {
        let config = AdmissionConfig::default();
        let blurry = rejection_message("hero", RejectionReason::TooBlurry, "image/jpeg", &config);
        assert!(blurry.contains("too blurry: hero"));
        let corrupt =
            rejection_message("hero", RejectionReason::ProcessingFailed, "image/jpeg", &config);
        assert!(corrupt.contains("File may be corrupted"));
    }

    #[test]
    fn failed_evaluation_is_retriable() {
        let human = humanize_error(&GateError::Evaluation("worker panicked".into()));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn config_error_needs_action() {
        let human = humanize_error(&GateError::Config("bad".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn missing_file_needs_action() {
        let err = GateError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }
}
