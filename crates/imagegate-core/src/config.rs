// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Admission configuration — thresholds, dimension bounds and the format
// allow-list. Passed explicitly into the evaluator; there are no globals.

use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};
use crate::types::normalize_mime;

/// Default Laplacian-variance threshold. Useful range is 500-2000; lower
/// values are stricter.
pub const DEFAULT_BLUR_THRESHOLD: f64 = 1000.0;

/// Default upper bound on either stored dimension.
pub const DEFAULT_MAX_DIMENSION: u32 = 2000;

/// Default JPEG quality used when re-encoding a resized upload.
pub const DEFAULT_RESIZE_JPEG_QUALITY: u8 = 80;

/// MIME types admitted when no allow-list is configured.
pub const DEFAULT_ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// What to do when the sharpness scorer itself fails on an image that
/// decoded fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringFailurePolicy {
    /// Treat the image as sharp and keep going.
    #[default]
    FailOpen,
    /// Reject the image as `processing-failed`.
    FailClosed,
}

/// Tunable admission settings.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Images whose sharpness score falls below this are rejected as blurry.
    pub blur_threshold: f64,
    /// Minimum accepted width in pixels (0 disables the check).
    pub min_width: u32,
    /// Minimum accepted height in pixels (0 disables the check).
    pub min_height: u32,
    /// Larger images are resized to fit inside `max_width` x `max_height`.
    pub max_width: u32,
    pub max_height: u32,
    /// Declared MIME types that may be admitted.
    pub allowed_types: Vec<String>,
    /// When false the sharpness score is never computed.
    pub blur_detection_enabled: bool,
    pub scoring_failure: ScoringFailurePolicy,
    /// JPEG quality (1-100) for resized JPEG output.
    pub resize_jpeg_quality: u8,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
            min_width: 0,
            min_height: 0,
            max_width: DEFAULT_MAX_DIMENSION,
            max_height: DEFAULT_MAX_DIMENSION,
            allowed_types: DEFAULT_ALLOWED_TYPES.iter().map(|t| (*t).to_owned()).collect(),
            blur_detection_enabled: true,
            scoring_failure: ScoringFailurePolicy::FailOpen,
            resize_jpeg_quality: DEFAULT_RESIZE_JPEG_QUALITY,
        }
    }
}

impl AdmissionConfig {
    /// Parse a JSON config document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&data)
    }

    /// Check that the settings are internally consistent.
    pub fn validate(&self) -> Result<()> {
        if !self.blur_threshold.is_finite() || self.blur_threshold < 0.0 {
            return Err(GateError::Config(format!(
                "blur_threshold must be a non-negative number, got {}",
                self.blur_threshold
            )));
        }
        if self.allowed_types.is_empty() {
            return Err(GateError::Config("allowed_types must not be empty".into()));
        }
        if self.max_width == 0 || self.max_height == 0 {
            return Err(GateError::Config(format!(
                "maximum dimensions must be positive, got {}x{}",
                self.max_width, self.max_height
            )));
        }
        if self.min_width > self.max_width || self.min_height > self.max_height {
            return Err(GateError::Config(format!(
                "minimum {}x{} exceeds maximum {}x{}",
                self.min_width, self.min_height, self.max_width, self.max_height
            )));
        }
        if !(1..=100).contains(&self.resize_jpeg_quality) {
            return Err(GateError::Config(format!(
                "resize_jpeg_quality must be within 1-100, got {}",
                self.resize_jpeg_quality
            )));
        }
        Ok(())
    }

    /// Whether a declared MIME type is on the allow-list. Case and MIME
    /// parameters are ignored.
    pub fn allows(&self, mime_type: &str) -> bool {
        let wanted = normalize_mime(mime_type);
        self.allowed_types
            .iter()
            .any(|allowed| normalize_mime(allowed) == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AdmissionConfig::default();
        assert_eq!(config.blur_threshold, 1000.0);
        assert_eq!((config.min_width, config.min_height), (0, 0));
        assert_eq!((config.max_width, config.max_height), (2000, 2000));
        assert!(config.blur_detection_enabled);
        assert_eq!(config.scoring_failure, ScoringFailurePolicy::FailOpen);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            AdmissionConfig::from_json(r#"{ "min_width": 320, "scoring_failure": "fail-closed" }"#)
                .expect("parse");
        assert_eq!(config.min_width, 320);
        assert_eq!(config.min_height, 0);
        assert_eq!(config.max_width, 2000);
        assert_eq!(config.scoring_failure, ScoringFailurePolicy::FailClosed);
    }

    #[test]
    fn allow_list_ignores_case_and_parameters() {
        let config = AdmissionConfig::default();
        assert!(config.allows("image/PNG"));
        assert!(config.allows(" image/jpeg; charset=binary"));
        assert!(!config.allows("image/tiff"));
        assert!(!config.allows("application/pdf"));
    }

    #[test]
    fn rejects_min_above_max() {
        let config = AdmissionConfig {
            min_width: 3000,
            ..AdmissionConfig::default()
        };
        assert!(matches!(config.validate(), Err(GateError::Config(_))));
    }

    #[test]
    fn rejects_negative_threshold() {
        let err = AdmissionConfig::from_json(r#"{ "blur_threshold": -1.0 }"#).unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
    }

    #[test]
    fn rejects_empty_allow_list() {
        let err = AdmissionConfig::from_json(r#"{ "allowed_types": [] }"#).unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = AdmissionConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, GateError::Serialization(_)));
    }
}
