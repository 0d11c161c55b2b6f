// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sharpness scoring — Laplacian variance over a bounded grayscale sample.
//
// Pipeline: luma -> fit inside SAMPLE_BOX x SAMPLE_BOX -> 3x3 Laplacian with
// replicated borders -> +128 bias clamped to u8 -> population variance.
// Scores are only comparable with the blur threshold if every step here is
// kept bit-for-bit; changing the kernel, border policy or clamp means the
// threshold must be recalibrated.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imagegate_core::Dimensions;
use imagegate_core::error::{GateError, Result};
use tracing::{debug, instrument};

/// Neither side of the scoring sample exceeds this many pixels.
pub const SAMPLE_BOX: u32 = 300;

/// Offset added to each Laplacian response before clamping to [0, 255].
pub const EDGE_BIAS: i32 = 128;

/// Computes a sharpness score for a decoded image. Higher is sharper.
pub trait SharpnessScorer: Send + Sync {
    fn score(&self, image: &DynamicImage) -> Result<f64>;
}

/// Variance of the Laplacian edge response.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaplacianScorer;

impl SharpnessScorer for LaplacianScorer {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn score(&self, image: &DynamicImage) -> Result<f64> {
        let sample = scoring_sample(image);
        let edges = edge_response(&sample);
        let variance = population_variance(&edges).ok_or_else(|| {
            GateError::Scoring(format!(
                "empty sample for {}x{} image",
                image.width(),
                image.height()
            ))
        })?;
        debug!(
            sample_w = sample.width(),
            sample_h = sample.height(),
            variance,
            "Laplacian variance computed"
        );
        Ok(variance)
    }
}

/// Grayscale copy of `image`, shrunk to fit inside `SAMPLE_BOX` on both
/// axes. Smaller images are not enlarged.
pub fn scoring_sample(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let current = Dimensions::new(gray.width(), gray.height());
    let target = current.fit_inside(SAMPLE_BOX, SAMPLE_BOX);
    if target == current {
        return gray;
    }
    imageops::resize(&gray, target.width, target.height, FilterType::Lanczos3)
}

/// Apply the kernel `[0,-1,0; -1,4,-1; 0,-1,0]` and map each response to
/// `clamp(response + 128, 0, 255)`.
///
/// Out-of-range neighbours take the value of the nearest edge pixel, so a
/// uniform image maps to a uniform 128 everywhere, borders included.
pub fn edge_response(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    let max_x = i64::from(width) - 1;
    let max_y = i64::from(height) - 1;
    let at = |x: i64, y: i64| -> i32 {
        let cx = x.clamp(0, max_x) as u32;
        let cy = y.clamp(0, max_y) as u32;
        i32::from(gray.get_pixel(cx, cy).0[0])
    };

    GrayImage::from_fn(width, height, |x, y| {
        let (x, y) = (i64::from(x), i64::from(y));
        let laplacian =
            4 * at(x, y) - at(x - 1, y) - at(x + 1, y) - at(x, y - 1) - at(x, y + 1);
        Luma([(laplacian + EDGE_BIAS).clamp(0, 255) as u8])
    })
}

/// Population variance of all pixel values: `E[X^2] - E[X]^2`.
///
/// Returns `None` for an empty image.
pub fn population_variance(map: &GrayImage) -> Option<f64> {
    let count = u64::from(map.width()) * u64::from(map.height());
    if count == 0 {
        return None;
    }

    let (sum, sum_sq) = map.pixels().fold((0u64, 0u64), |(sum, sum_sq), pixel| {
        let value = u64::from(pixel.0[0]);
        (sum + value, sum_sq + value * value)
    });

    let mean = sum as f64 / count as f64;
    let mean_sq = sum_sq as f64 / count as f64;
    // Rounding can push a zero variance a hair below zero.
    Some((mean_sq - mean * mean).max(0.0))
}
