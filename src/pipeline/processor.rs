//! End-to-end shelf processing orchestrator (on-device path).
//!
//! Drives one photo through the full pipeline: segment → one task per
//! detected spine → recognize spine text → serialized inference → parse
//! → validate → review-queue sink. One book's failure never aborts its
//! siblings; failures are collected per book in the outcome.

use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::pipeline::extraction::validate::{self, ValidationError};
use crate::pipeline::extraction::{
    prompt, sanitize, BookSpineInfo, ExtractionError, ExtractionSerializer, SpineTextRecognizer,
};
use crate::pipeline::segmentation::{SegmentationCoordinator, SegmentationError};

/// Delivery channel to the external review queue. Append-only; ordering
/// across books is not guaranteed to match detection order.
pub type ReviewSink = mpsc::UnboundedSender<(BookSpineInfo, String)>;

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("segmentation failed: {0}")]
    Segmentation(#[from] SegmentationError),
}

/// Why one book's record was not delivered.
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("review sink closed")]
    SinkClosed,
}

/// Per-book failure, reported in the shelf outcome.
#[derive(Debug, Clone, Serialize)]
pub struct BookFailure {
    /// Index of the book in detection order.
    pub index: usize,
    pub reason: String,
}

/// Summary of one shelf pass.
#[derive(Debug, Clone, Serialize)]
pub struct ShelfOutcome {
    pub books_detected: usize,
    pub records_delivered: usize,
    pub failures: Vec<BookFailure>,
}

/// Orchestrates the on-device pipeline for one photo at a time.
///
/// Trait-based DI for the recognizer; the inference session is reached
/// only through the serializer handle, never directly.
pub struct ShelfProcessor {
    coordinator: SegmentationCoordinator,
    serializer: ExtractionSerializer,
    recognizer: Arc<dyn SpineTextRecognizer>,
    review_tx: ReviewSink,
}

impl ShelfProcessor {
    pub fn new(
        coordinator: SegmentationCoordinator,
        serializer: ExtractionSerializer,
        recognizer: Arc<dyn SpineTextRecognizer>,
        review_tx: ReviewSink,
    ) -> Self {
        Self {
            coordinator,
            serializer,
            recognizer,
            review_tx,
        }
    }

    /// Process one shelf photo to completion.
    ///
    /// Fails only when segmentation finds nothing at all; everything past
    /// that point is per-book and lands in `ShelfOutcome::failures`.
    pub async fn process_shelf(
        &self,
        image: &DynamicImage,
    ) -> Result<ShelfOutcome, ProcessingError> {
        let books = self.coordinator.segment(image)?;
        let detected = books.len();
        tracing::info!(books = detected, "shelf segmented, spawning extraction tasks");

        let mut tasks: JoinSet<(usize, Result<(), BookError>)> = JoinSet::new();
        for (index, book) in books.into_iter().enumerate() {
            let serializer = self.serializer.clone();
            let recognizer = Arc::clone(&self.recognizer);
            let review_tx = self.review_tx.clone();
            tasks.spawn(async move {
                let result =
                    extract_one(&book.cropped_image, &serializer, &*recognizer, &review_tx).await;
                (index, result)
            });
        }

        let mut delivered = 0;
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => delivered += 1,
                Ok((index, Err(e))) => {
                    tracing::warn!(book = index, error = %e, "book extraction failed");
                    failures.push(BookFailure {
                        index,
                        reason: e.to_string(),
                    });
                }
                Err(join_err) => {
                    tracing::warn!(error = %join_err, "book task cancelled or panicked");
                }
            }
        }

        failures.sort_by_key(|f| f.index);
        Ok(ShelfOutcome {
            books_detected: detected,
            records_delivered: delivered,
            failures,
        })
    }
}

/// One book's path: recognize → prompt → serialized inference → validate
/// → deliver.
async fn extract_one(
    crop: &DynamicImage,
    serializer: &ExtractionSerializer,
    recognizer: &dyn SpineTextRecognizer,
    review_tx: &ReviewSink,
) -> Result<(), BookError> {
    let raw_text = recognizer.recognize(crop).await?;
    let spine_text = sanitize::normalize_spine_text(&raw_text);
    let source_len = spine_text.chars().count();

    let info = serializer
        .submit(prompt::build_spine_prompt(&spine_text))
        .await?;
    let info = validate::validate(info, source_len)?;

    let raw_payload = info.raw_payload.clone();
    review_tx
        .send((info, raw_payload))
        .map_err(|_| BookError::SinkClosed)?;
    Ok(())
}
