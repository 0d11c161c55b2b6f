// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload gate — judges every upload of a request and applies the side
// effects: discard the rejected file, overwrite shrunk files.
//
// Each upload goes through two phases. `assess` reads and evaluates it and
// has no side effects, so it may run on a blocking thread. `settle` turns an
// assessment into either a slot update or the batch rejection, touching the
// store as it goes. Settling always happens in input order and stops at the
// first rejection, which keeps the concurrent mode observably identical to
// the sequential one.

use std::sync::Arc;

use imagegate_core::error::GateError;
use imagegate_core::human_errors::rejection_message;
use imagegate_core::{Dimensions, Rejection, RejectionReason, SlotUpdate, Upload};
use imagegate_quality::{Admission, AdmissionEvaluator, ImageUpload};
use imagegate_storage::{UploadStore, fingerprint};
use tracing::{Instrument, Span, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::outcome::{BatchOutcome, BatchReport};

/// Result of reading and evaluating one upload, before any side effects.
enum Assessment {
    /// Declared type is not on the allow-list; the bytes were never read.
    WrongType,
    /// The bytes could not be read, or the evaluation task died.
    Unavailable(GateError),
    Judged {
        digest: String,
        admission: Admission,
    },
}

/// Batch admission over an upload store.
#[derive(Clone)]
pub struct UploadGate {
    evaluator: Arc<AdmissionEvaluator>,
    store: Arc<dyn UploadStore>,
}

impl UploadGate {
    pub fn new(evaluator: AdmissionEvaluator, store: Arc<dyn UploadStore>) -> Self {
        Self {
            evaluator: Arc::new(evaluator),
            store,
        }
    }

    pub fn evaluator(&self) -> &AdmissionEvaluator {
        &self.evaluator
    }

    // -- Sequential -----------------------------------------------------------

    /// Judge `uploads` one at a time. The first rejection ends the batch:
    /// later uploads are never read, evaluated or touched.
    pub fn evaluate(&self, uploads: &[Upload]) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let span = info_span!("batch", %batch_id, uploads = uploads.len());
        let _guard = span.enter();

        let outcome = self.fold(
            uploads
                .iter()
                .map(|upload| (upload, assess(&self.evaluator, self.store.as_ref(), upload))),
        );
        self.report(batch_id, outcome)
    }

    // -- Concurrent -----------------------------------------------------------

    /// Judge all uploads in parallel on tokio's blocking pool, then settle
    /// them in input order. The reported rejection is the first failing slot
    /// in input order; uploads after it may have been read but are never
    /// modified.
    pub async fn evaluate_concurrent(&self, uploads: &[Upload]) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let span = info_span!("batch", %batch_id, uploads = uploads.len(), concurrent = true);

        async {
            let handles: Vec<_> = uploads
                .iter()
                .cloned()
                .map(|upload| {
                    let evaluator = Arc::clone(&self.evaluator);
                    let store = Arc::clone(&self.store);
                    let span = Span::current();
                    tokio::task::spawn_blocking(move || {
                        span.in_scope(|| assess(&evaluator, store.as_ref(), &upload))
                    })
                })
                .collect();

            let mut assessments = Vec::with_capacity(handles.len());
            for handle in handles {
                let assessment = match handle.await {
                    Ok(assessment) => assessment,
                    Err(join_err) => {
                        error!(error = %join_err, "evaluation task failed");
                        Assessment::Unavailable(GateError::Evaluation(join_err.to_string()))
                    }
                };
                assessments.push(assessment);
            }

            let outcome = self.fold(uploads.iter().zip(assessments));
            self.report(batch_id, outcome)
        }
        .instrument(span)
        .await
    }

    // -- Settling -------------------------------------------------------------

    /// Short-circuiting fold: the first `Err` wins and stops iteration, so
    /// lazily produced assessments after it are never computed.
    fn fold<'a>(
        &self,
        assessed: impl Iterator<Item = (&'a Upload, Assessment)>,
    ) -> BatchOutcome {
        let result = assessed.into_iter().try_fold(
            Vec::new(),
            |mut updates, (upload, assessment)| {
                updates.extend(self.settle(upload, assessment)?);
                Ok::<_, Rejection>(updates)
            },
        );
        match result {
            Ok(updates) => BatchOutcome::Proceed { updates },
            Err(rejection) => BatchOutcome::Rejected(rejection),
        }
    }

    fn report(&self, batch_id: Uuid, outcome: BatchOutcome) -> BatchReport {
        match &outcome {
            BatchOutcome::Proceed { updates } => {
                info!(resized = updates.len(), "all uploads passed quality checks");
            }
            BatchOutcome::Rejected(rejection) => {
                info!(slot = %rejection.slot, reason = %rejection.reason, "batch rejected");
            }
        }
        BatchReport::new(batch_id, outcome)
    }

    /// Apply the side effects for one assessed upload.
    #[instrument(skip(self, upload, assessment), fields(slot = %upload.slot))]
    fn settle(
        &self,
        upload: &Upload,
        assessment: Assessment,
    ) -> Result<Option<SlotUpdate>, Rejection> {
        match assessment {
            Assessment::WrongType => {
                Err(self.reject(upload, RejectionReason::WrongFormat, None))
            }
            Assessment::Unavailable(err) => {
                warn!(error = %err, "upload could not be evaluated");
                Err(self.reject(upload, RejectionReason::ProcessingFailed, None))
            }
            Assessment::Judged { digest, admission } => {
                let Admission { verdict, resized } = admission;
                if let Some(reason) = verdict.rejection {
                    return Err(self.reject(upload, reason, Some(&digest)));
                }
                match (resized, verdict.dimensions, verdict.normalized) {
                    (Some(bytes), Some(original), Some(normalized)) => {
                        Ok(self.persist_resized(upload, &bytes, original, normalized))
                    }
                    _ => Ok(None),
                }
            }
        }
    }

    /// Overwrite the upload with its resized encoding. Failure keeps the
    /// original and is not a rejection.
    fn persist_resized(
        &self,
        upload: &Upload,
        bytes: &[u8],
        original: Dimensions,
        normalized: Dimensions,
    ) -> Option<SlotUpdate> {
        match self.store.overwrite(&upload.location, bytes) {
            Ok(()) => {
                info!(from = %original, to = %normalized, "resized upload stored");
                Some(SlotUpdate {
                    slot: upload.slot.clone(),
                    location: upload.location.clone(),
                    original,
                    normalized,
                })
            }
            Err(err) => {
                warn!(error = %err, "failed to store resized upload; keeping original");
                None
            }
        }
    }

    /// Discard the upload and build the rejection reported to the client.
    fn reject(&self, upload: &Upload, reason: RejectionReason, digest: Option<&str>) -> Rejection {
        info!(reason = %reason, sha256 = digest.unwrap_or("-"), "upload rejected");
        if let Err(err) = self.store.discard(&upload.location) {
            warn!(error = %err, location = %upload.location, "failed to discard rejected upload");
        }
        Rejection {
            slot: upload.slot.clone(),
            reason,
            message: rejection_message(
                &upload.slot,
                reason,
                &upload.mime_type,
                self.evaluator.config(),
            ),
        }
    }
}

/// Read and evaluate one upload. Touches the store only to read.
fn assess(evaluator: &AdmissionEvaluator, store: &dyn UploadStore, upload: &Upload) -> Assessment {
    if !evaluator.admits_type(&upload.mime_type) {
        return Assessment::WrongType;
    }
    let bytes = match store.read(&upload.location) {
        Ok(bytes) => bytes,
        Err(err) => return Assessment::Unavailable(err),
    };
    debug!(slot = %upload.slot, len = bytes.len(), "upload read");

    let admission = evaluator.evaluate(&ImageUpload {
        slot: &upload.slot,
        mime_type: &upload.mime_type,
        bytes: &bytes,
        declared: upload.declared,
    });
    Assessment::Judged {
        digest: fingerprint(&bytes),
        admission,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
    use imagegate_core::AdmissionConfig;
    use imagegate_quality::SharpnessScorer;
    use imagegate_storage::{LocalFileStore, MemoryStore, StoreOp};

    fn png(image: DynamicImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .expect("encode png");
        buffer
    }

    fn sharp_png(width: u32, height: u32) -> Vec<u8> {
        png(DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
            if ((x / 3) + (y / 3)) % 2 == 0 {
                Luma([10u8])
            } else {
                Luma([245u8])
            }
        })))
    }

    fn flat_png(width: u32, height: u32) -> Vec<u8> {
        png(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([240, 240, 240]),
        )))
    }

    fn gate_with(config: AdmissionConfig, store: Arc<MemoryStore>) -> UploadGate {
        UploadGate::new(AdmissionEvaluator::new(config).expect("config"), store)
    }

    fn seeded_store(files: &[(&str, Vec<u8>)]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (location, bytes) in files {
            store.insert(*location, bytes.clone());
        }
        store
    }

    #[test]
    fn empty_batch_proceeds() {
        let store = Arc::new(MemoryStore::new());
        let report = gate_with(AdmissionConfig::default(), store.clone()).evaluate(&[]);
        assert!(report.success);
        assert!(report.updates().is_empty());
        assert!(store.ops().is_empty());
    }

    #[test]
    fn all_sharp_uploads_proceed() {
        let store = seeded_store(&[("a.png", sharp_png(64, 64)), ("b.png", sharp_png(80, 40))]);
        let uploads = [
            Upload::new("front", "image/png", "a.png"),
            Upload::new("back", "image/png", "b.png"),
        ];
        let report = gate_with(AdmissionConfig::default(), store.clone()).evaluate(&uploads);
        assert!(report.success, "{:?}", report.rejection());
        assert!(store.contains("a.png") && store.contains("b.png"));
    }

    #[test]
    fn second_slot_wrong_format_stops_batch() {
        let store = seeded_store(&[
            ("1.png", sharp_png(64, 64)),
            ("2.bmp", sharp_png(64, 64)),
            ("3.png", sharp_png(64, 64)),
        ]);
        let uploads = [
            Upload::new("thumbnail", "image/png", "1.png"),
            Upload::new("gallery", "image/bmp", "2.bmp"),
            Upload::new("banner", "image/png", "3.png"),
        ];
        let report = gate_with(AdmissionConfig::default(), store.clone()).evaluate(&uploads);

        let rejection = report.rejection().expect("rejected");
        assert_eq!(rejection.slot, "gallery");
        assert_eq!(rejection.reason, RejectionReason::WrongFormat);
        assert!(rejection.message.contains("image/bmp"));

        assert_eq!(
            store.ops(),
            vec![StoreOp::Read("1.png".into()), StoreOp::Discard("2.bmp".into())]
        );
        assert!(store.contains("3.png"));
        assert!(!store.contains("2.bmp"));
    }

    #[test]
    fn blurry_upload_is_discarded() {
        let store = seeded_store(&[("flat.png", flat_png(100, 100))]);
        let uploads = [Upload::new("hero", "image/png", "flat.png")];
        let report = gate_with(AdmissionConfig::default(), store.clone()).evaluate(&uploads);

        let rejection = report.rejection().expect("rejected");
        assert_eq!(rejection.reason, RejectionReason::TooBlurry);
        assert!(!store.contains("flat.png"));
    }

    #[test]
    fn unreadable_upload_is_processing_failed() {
        let store = Arc::new(MemoryStore::new());
        let uploads = [Upload::new("hero", "image/jpeg", "missing.jpg")];
        let report = gate_with(AdmissionConfig::default(), store.clone()).evaluate(&uploads);

        let rejection = report.rejection().expect("rejected");
        assert_eq!(rejection.reason, RejectionReason::ProcessingFailed);
        assert_eq!(
            store.ops(),
            vec![
                StoreOp::Read("missing.jpg".into()),
                StoreOp::Discard("missing.jpg".into())
            ]
        );
    }

    #[test]
    fn oversized_upload_is_overwritten() {
        let config = AdmissionConfig {
            max_width: 50,
            max_height: 50,
            ..AdmissionConfig::default()
        };
        let store = seeded_store(&[("big.png", sharp_png(200, 100))]);
        let uploads = [Upload::new("hero", "image/png", "big.png")];
        let report = gate_with(config, store.clone()).evaluate(&uploads);

        assert!(report.success, "{:?}", report.rejection());
        let update = &report.updates()[0];
        assert_eq!(update.original, Dimensions::new(200, 100));
        assert_eq!(update.normalized, Dimensions::new(50, 25));

        let stored = image::load_from_memory(&store.get("big.png").expect("stored")).expect("decode");
        assert_eq!((stored.width(), stored.height()), (50, 25));
    }

    #[test]
    fn failed_overwrite_still_proceeds() {
        let config = AdmissionConfig {
            max_width: 50,
            max_height: 50,
            ..AdmissionConfig::default()
        };
        let original = sharp_png(200, 100);
        let store = seeded_store(&[("big.png", original.clone())]);
        store.fail_overwrites(true);

        let uploads = [Upload::new("hero", "image/png", "big.png")];
        let report = gate_with(config, store.clone()).evaluate(&uploads);

        assert!(report.success);
        assert!(report.updates().is_empty());
        assert_eq!(store.get("big.png"), Some(original));
    }

    #[test]
    fn too_small_message_names_minimum() {
        let config = AdmissionConfig {
            min_width: 500,
            min_height: 500,
            ..AdmissionConfig::default()
        };
        let store = seeded_store(&[("s.png", sharp_png(64, 64))]);
        let uploads = [Upload::new("logo", "image/png", "s.png")];
        let report = gate_with(config, store).evaluate(&uploads);

        let rejection = report.rejection().expect("rejected");
        assert_eq!(rejection.reason, RejectionReason::TooSmall);
        assert_eq!(
            rejection.message,
            "Image resolution too low for logo. Minimum 500x500px required."
        );
    }

    #[tokio::test]
    async fn concurrent_reports_first_failure_in_input_order() {
        let store = seeded_store(&[
            ("1.png", sharp_png(64, 64)),
            ("2.png", flat_png(64, 64)),
            ("3.gif", sharp_png(64, 64)),
            ("4.png", flat_png(64, 64)),
        ]);
        let uploads = [
            Upload::new("one", "image/png", "1.png"),
            Upload::new("two", "image/png", "2.png"),
            Upload::new("three", "text/plain", "3.gif"),
            Upload::new("four", "image/png", "4.png"),
        ];
        let report = gate_with(AdmissionConfig::default(), store.clone())
            .evaluate_concurrent(&uploads)
            .await;

        let rejection = report.rejection().expect("rejected");
        assert_eq!(rejection.slot, "two");
        assert_eq!(rejection.reason, RejectionReason::TooBlurry);

        // Only the reported slot is discarded; later failures are untouched.
        assert!(!store.contains("2.png"));
        assert!(store.contains("3.gif"));
        assert!(store.contains("4.png"));
        let discards = store
            .ops()
            .into_iter()
            .filter(|op| matches!(op, StoreOp::Discard(_)))
            .count();
        assert_eq!(discards, 1);
    }

    struct PanickingScorer;

    impl SharpnessScorer for PanickingScorer {
        fn score(&self, _image: &DynamicImage) -> imagegate_core::error::Result<f64> {
            panic!("scorer blew up")
        }
    }

    fn panicking_gate(store: Arc<MemoryStore>) -> UploadGate {
        let evaluator =
            AdmissionEvaluator::with_scorer(AdmissionConfig::default(), Box::new(PanickingScorer))
                .expect("config");
        UploadGate::new(evaluator, store)
    }

    #[test]
    fn scorer_panic_fails_open_sequentially() {
        let store = seeded_store(&[("a.png", sharp_png(64, 64))]);
        let uploads = [Upload::new("a", "image/png", "a.png")];
        let report = panicking_gate(store.clone()).evaluate(&uploads);
        assert!(report.success, "{:?}", report.rejection());
        assert!(store.contains("a.png"));
    }

    #[tokio::test]
    async fn scorer_panic_fails_open_concurrently() {
        let store = seeded_store(&[("a.png", sharp_png(64, 64)), ("b.png", flat_png(64, 64))]);
        let uploads = [
            Upload::new("a", "image/png", "a.png"),
            Upload::new("b", "image/png", "b.png"),
        ];
        let report = panicking_gate(store.clone()).evaluate_concurrent(&uploads).await;
        assert!(report.success, "{:?}", report.rejection());
        assert!(store.contains("a.png") && store.contains("b.png"));
    }

    #[tokio::test]
    async fn concurrent_matches_sequential_on_success() {
        let config = AdmissionConfig {
            max_width: 40,
            max_height: 40,
            ..AdmissionConfig::default()
        };
        let files = [("a.png", sharp_png(120, 60)), ("b.png", sharp_png(30, 30))];
        let uploads = [
            Upload::new("a", "image/png", "a.png"),
            Upload::new("b", "image/png", "b.png"),
        ];

        let sequential = gate_with(config.clone(), seeded_store(&files)).evaluate(&uploads);
        let concurrent = gate_with(config, seeded_store(&files))
            .evaluate_concurrent(&uploads)
            .await;

        assert_eq!(sequential.outcome, concurrent.outcome);
        assert_eq!(concurrent.updates().len(), 1);
        assert_eq!(concurrent.updates()[0].normalized, Dimensions::new(40, 20));
    }

    #[test]
    fn local_store_rejection_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("flat.png"), flat_png(90, 90)).expect("seed");
        std::fs::write(dir.path().join("ok.png"), sharp_png(90, 90)).expect("seed");

        let gate = UploadGate::new(
            AdmissionEvaluator::new(AdmissionConfig::default()).expect("config"),
            Arc::new(LocalFileStore::with_root(dir.path())),
        );
        let uploads = [
            Upload::new("ok", "image/png", "ok.png"),
            Upload::new("flat", "image/png", "flat.png"),
        ];
        let report = gate.evaluate(&uploads);

        assert_eq!(report.rejection().expect("rejected").slot, "flat");
        assert!(!dir.path().join("flat.png").exists());
        assert!(dir.path().join("ok.png").exists());
    }
}
