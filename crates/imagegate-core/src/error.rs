// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for imagegate.
//
// Rejections are not errors: a batch that is turned away was still evaluated
// successfully. `GateError` covers faults in the machinery itself.

use thiserror::Error;

/// Top-level error type for all imagegate operations.
#[derive(Debug, Error)]
pub enum GateError {
    // -- Image errors --
    #[error("image decoding failed: {0}")]
    Decode(String),

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("sharpness scoring failed: {0}")]
    Scoring(String),

    /// The worker evaluating an upload died before producing a verdict.
    #[error("evaluation task failed: {0}")]
    Evaluation(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage --
    #[error("upload store error at {location}: {detail}")]
    Storage { location: String, detail: String },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GateError>;
