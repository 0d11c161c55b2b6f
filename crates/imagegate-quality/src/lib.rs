// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imagegate-quality — Image quality checks for uploaded product photos.
//
// Provides an image processor (decode, fit-inside resize,
// re-encode), a Laplacian-variance sharpness scorer, and the per-image
// admission evaluator that combines format, dimension and blur checks.

pub mod admission;
pub mod processor;
pub mod sharpness;

pub use admission::{Admission, AdmissionEvaluator, ImageUpload};
pub use processor::ImageProcessor;
pub use sharpness::{LaplacianScorer, SharpnessScorer};
