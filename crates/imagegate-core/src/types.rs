// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the imagegate upload quality gate.

use serde::{Deserialize, Serialize};

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either side exceeds the given box.
    pub fn exceeds(&self, max_width: u32, max_height: u32) -> bool {
        self.width > max_width || self.height > max_height
    }

    /// Whether either side is below the given minimum.
    pub fn below(&self, min_width: u32, min_height: u32) -> bool {
        self.width < min_width || self.height < min_height
    }

    /// Largest dimensions with the same aspect ratio that fit inside
    /// `max_width` x `max_height`. Never enlarges: an image that already fits
    /// is returned unchanged. Each side is at least 1 pixel.
    pub fn fit_inside(&self, max_width: u32, max_height: u32) -> Self {
        if !self.exceeds(max_width, max_height) || self.width == 0 || self.height == 0 {
            return *self;
        }
        let scale = f64::min(
            max_width as f64 / self.width as f64,
            max_height as f64 / self.height as f64,
        );
        let width = ((self.width as f64 * scale).round() as u32).clamp(1, max_width);
        let height = ((self.height as f64 * scale).round() as u32).clamp(1, max_height);
        Self { width, height }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Lower-case a MIME type and strip any parameters (`; charset=...`).
pub fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Image encodings the gate knows how to name and re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl ImageKind {
    /// Canonical MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Short name used in user-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WebP",
            Self::Gif => "GIF",
        }
    }

    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match normalize_mime(mime_type).as_str() {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Infer the kind from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

/// One uploaded file awaiting admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    /// Human-readable upload field name (e.g. "thumbnail").
    pub slot: String,
    /// MIME type declared by the client.
    pub mime_type: String,
    /// Where the upload store keeps the bytes.
    pub location: String,
    /// Dimensions reported by the client, if any.
    pub declared: Option<Dimensions>,
}

impl Upload {
    pub fn new(
        slot: impl Into<String>,
        mime_type: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            slot: slot.into(),
            mime_type: mime_type.into(),
            location: location.into(),
            declared: None,
        }
    }

    pub fn with_declared(mut self, dimensions: Dimensions) -> Self {
        self.declared = Some(dimensions);
        self
    }
}

/// Why an image was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    WrongFormat,
    TooSmall,
    TooBlurry,
    ProcessingFailed,
}

impl RejectionReason {
    /// Stable reason code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WrongFormat => "wrong-format",
            Self::TooSmall => "too-small",
            Self::TooBlurry => "too-blurry",
            Self::ProcessingFailed => "processing-failed",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Decision for a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionVerdict {
    /// `None` when the image was admitted.
    pub rejection: Option<RejectionReason>,
    /// Laplacian variance, when it was computed.
    pub sharpness: Option<f64>,
    /// True (decoded) dimensions, when decoding succeeded.
    pub dimensions: Option<Dimensions>,
    /// New dimensions if the image was resized.
    pub normalized: Option<Dimensions>,
}

impl AdmissionVerdict {
    pub fn rejected(reason: RejectionReason) -> Self {
        Self {
            rejection: Some(reason),
            sharpness: None,
            dimensions: None,
            normalized: None,
        }
    }

    pub fn accepted(&self) -> bool {
        self.rejection.is_none()
    }

    /// `"ok"` or the rejection code.
    pub fn reason_code(&self) -> &'static str {
        self.rejection.map_or("ok", |reason| reason.code())
    }
}

/// The single rejection reported for a failed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub slot: String,
    pub reason: RejectionReason,
    pub message: String,
}

/// Dimension change applied to an admitted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotUpdate {
    pub slot: String,
    pub location: String,
    pub original: Dimensions,
    pub normalized: Dimensions,
}
