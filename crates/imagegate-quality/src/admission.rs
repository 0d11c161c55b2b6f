// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-image admission — format gate, decode, minimum dimensions, blur check
// and oversize normalisation, in that order.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use imagegate_core::config::{AdmissionConfig, ScoringFailurePolicy};
use imagegate_core::error::{GateError, Result};
use imagegate_core::{AdmissionVerdict, Dimensions, ImageKind, RejectionReason};
use tracing::{debug, info, instrument, warn};

use crate::processor::ImageProcessor;
use crate::sharpness::{LaplacianScorer, SharpnessScorer};

/// One image as handed to the evaluator.
#[derive(Debug, Clone, Copy)]
pub struct ImageUpload<'a> {
    pub slot: &'a str,
    pub mime_type: &'a str,
    pub bytes: &'a [u8],
    /// Dimensions the client claims; informational only.
    pub declared: Option<Dimensions>,
}

/// Outcome of evaluating one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub verdict: AdmissionVerdict,
    /// Re-encoded bytes when the image was shrunk; the caller persists them.
    pub resized: Option<Vec<u8>>,
}

impl Admission {
    fn rejected(reason: RejectionReason) -> Self {
        Self {
            verdict: AdmissionVerdict::rejected(reason),
            resized: None,
        }
    }
}

/// Stateless evaluator. Cheap to share between threads.
pub struct AdmissionEvaluator {
    config: AdmissionConfig,
    scorer: Box<dyn SharpnessScorer>,
}

impl AdmissionEvaluator {
    /// Evaluator with the Laplacian scorer.
    pub fn new(config: AdmissionConfig) -> Result<Self> {
        Self::with_scorer(config, Box::new(LaplacianScorer))
    }

    /// Evaluator with a caller-supplied scorer.
    pub fn with_scorer(config: AdmissionConfig, scorer: Box<dyn SharpnessScorer>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, scorer })
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Whether the declared MIME type passes the format gate.
    pub fn admits_type(&self, mime_type: &str) -> bool {
        self.config.allows(mime_type)
    }

    /// Run the scorer. A panic inside it is a scoring fault like any other,
    /// so the failure policy decides what happens next.
    fn score(&self, processor: &ImageProcessor) -> Result<f64> {
        panic::catch_unwind(AssertUnwindSafe(|| self.scorer.score(processor.as_dynamic())))
            .unwrap_or_else(|payload| {
                Err(GateError::Scoring(format!(
                    "scorer panicked: {}",
                    panic_message(payload.as_ref())
                )))
            })
    }

    /// Decide whether one image may be stored. Always returns a verdict;
    /// internal faults become `processing-failed` or are ignored according
    /// to the scoring failure policy.
    #[instrument(skip(self, upload), fields(slot = upload.slot, mime = upload.mime_type, len = upload.bytes.len()))]
    pub fn evaluate(&self, upload: &ImageUpload<'_>) -> Admission {
        let config = &self.config;

        if !self.admits_type(upload.mime_type) {
            info!("Rejected: type not on allow-list");
            return Admission::rejected(RejectionReason::WrongFormat);
        }

        let mut processor = match ImageProcessor::from_bytes(upload.bytes) {
            Ok(processor) => processor,
            Err(err) => {
                warn!(error = %err, "Rejected: image could not be decoded");
                return Admission::rejected(RejectionReason::ProcessingFailed);
            }
        };
        if processor.format().is_none() {
            if let Some(kind) = ImageKind::from_mime(upload.mime_type) {
                processor = processor.with_kind(kind);
            }
        }

        let dimensions = processor.dimensions();
        if let Some(declared) = upload.declared {
            if declared != dimensions {
                debug!(%declared, actual = %dimensions, "Declared dimensions differ from decoded");
            }
        }

        let mut verdict = AdmissionVerdict {
            rejection: None,
            sharpness: None,
            dimensions: Some(dimensions),
            normalized: None,
        };

        if dimensions.below(config.min_width, config.min_height) {
            info!(%dimensions, min_w = config.min_width, min_h = config.min_height, "Rejected: resolution too low");
            verdict.rejection = Some(RejectionReason::TooSmall);
            return Admission {
                verdict,
                resized: None,
            };
        }

        if config.blur_detection_enabled {
            match self.score(&processor) {
                Ok(score) => {
                    verdict.sharpness = Some(score);
                    let blurry = score < config.blur_threshold;
                    info!(score, threshold = config.blur_threshold, blurry, "Blur analysis");
                    if blurry {
                        verdict.rejection = Some(RejectionReason::TooBlurry);
                        return Admission {
                            verdict,
                            resized: None,
                        };
                    }
                }
                Err(err) => match config.scoring_failure {
                    ScoringFailurePolicy::FailOpen => {
                        warn!(error = %err, "Blur detection failed; treating image as sharp");
                    }
                    ScoringFailurePolicy::FailClosed => {
                        warn!(error = %err, "Blur detection failed; rejecting image");
                        verdict.rejection = Some(RejectionReason::ProcessingFailed);
                        return Admission {
                            verdict,
                            resized: None,
                        };
                    }
                },
            }
        } else {
            debug!("Blur detection disabled");
        }

        let mut resized = None;
        if dimensions.exceeds(config.max_width, config.max_height) {
            let shrunk = processor.fit_inside(config.max_width, config.max_height);
            match shrunk.encode(config.resize_jpeg_quality) {
                Ok(bytes) => {
                    info!(from = %dimensions, to = %shrunk.dimensions(), "Image normalised");
                    verdict.normalized = Some(shrunk.dimensions());
                    resized = Some(bytes);
                }
                Err(err) => {
                    warn!(error = %err, "Resize failed; keeping original image");
                }
            }
        }

        info!(%dimensions, "Image passed quality checks");
        Admission { verdict, resized }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
