// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, fit-inside resize and re-encode.
// Operates on in-memory images using the `image` crate.

use image::{DynamicImage, ImageFormat};
use imagegate_core::error::GateError;
use imagegate_core::{Dimensions, ImageKind};
use tracing::{debug, info, instrument};

/// A single decoded image plus the encoding it arrived in.
///
/// Transformations consume `self` and return a new `ImageProcessor`, so calls
/// chain:
///
/// ```ignore
/// let bytes = ImageProcessor::from_bytes(&upload)?
///     .fit_inside(2000, 2000)
///     .encode(80)?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
    /// Format sniffed from the input bytes, if recognisable.
    format: Option<ImageFormat>,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (JPEG, PNG, WebP, GIF, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, GateError> {
        let format = image::guess_format(data).ok();
        let img = image::load_from_memory(data)
            .map_err(|err| GateError::Decode(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            format = ?format,
            "Image decoded from bytes"
        );
        Ok(Self { image: img, format })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image,
            format: None,
        }
    }

    /// Remember the encoding to use when writing the image back out.
    pub fn with_kind(mut self, kind: ImageKind) -> Self {
        self.format = Some(format_for_kind(kind));
        self
    }

    // -- Accessors ------------------------------------------------------------

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Shrink the image to fit within `max_width` x `max_height`, preserving
    /// aspect ratio. Images that already fit are returned untouched. Uses
    /// Lanczos3 filtering.
    #[instrument(skip(self))]
    pub fn fit_inside(self, max_width: u32, max_height: u32) -> Self {
        let current = self.dimensions();
        let target = current.fit_inside(max_width, max_height);
        if target == current {
            return self;
        }
        info!(from = %current, to = %target, "Resizing image");
        let resized = self.image.resize_exact(
            target.width,
            target.height,
            image::imageops::FilterType::Lanczos3,
        );
        Self {
            image: resized,
            format: self.format,
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode in the image's own format (PNG when unknown). JPEG output uses
    /// `jpeg_quality`.
    pub fn encode(&self, jpeg_quality: u8) -> Result<Vec<u8>, GateError> {
        match self.format.unwrap_or(ImageFormat::Png) {
            ImageFormat::Jpeg => self.to_jpeg_bytes(jpeg_quality),
            format => encode_to_format(&self.image, format),
        }
    }

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, GateError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, GateError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| GateError::Encode(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

fn format_for_kind(kind: ImageKind) -> ImageFormat {
    match kind {
        ImageKind::Jpeg => ImageFormat::Jpeg,
        ImageKind::Png => ImageFormat::Png,
        ImageKind::WebP => ImageFormat::WebP,
        ImageKind::Gif => ImageFormat::Gif,
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, GateError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| GateError::Encode(format!("{:?} encoding failed: {}", format, err)))?;
    Ok(buffer)
}
