use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use cupom_core::{ExtractionConfig, ExtractionResult, MAX_RECOGNITION_TIMEOUT_SECS};

use crate::amount::AmountResolver;
use crate::description::DescriptionResolver;
use crate::preprocess::{self, PreparedImage, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError};
use crate::tokens::TokenExtractor;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input could not be read as an image at all.
    #[error("Could not read image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(PreprocessError),
    #[error("Extraction task failed: {0}")]
    Internal(String),
}

impl From<PreprocessError> for PipelineError {
    fn from(e: PreprocessError) -> Self {
        match e {
            PreprocessError::Decode(e) => PipelineError::Decode(e),
            other => PipelineError::Preprocess(other),
        }
    }
}

/// Orchestrates: preprocess → recognize every variant → pool text →
/// tokens → amount + description.
///
/// Holds only immutable configuration and the recognizer, so one pipeline can
/// serve concurrent callers behind an `Arc`.
pub struct ExtractionPipeline<R: OcrBackend> {
    recognizer: Arc<R>,
    config: ExtractionConfig,
    tokens: TokenExtractor,
    amounts: AmountResolver,
    descriptions: DescriptionResolver,
}

impl<R: OcrBackend + 'static> ExtractionPipeline<R> {
    /// Out-of-range numeric settings are coerced with
    /// [`ExtractionConfig::sanitized`].
    pub fn new(recognizer: R, config: ExtractionConfig) -> Self {
        let config = config.sanitized();
        Self {
            recognizer: Arc::new(recognizer),
            tokens: TokenExtractor::new(&config.keywords),
            amounts: AmountResolver::new(config.magnitude_window),
            descriptions: DescriptionResolver::new(config.max_description_length),
            config,
        }
    }

    /// Extract a (description, amount) guess from encoded image bytes.
    ///
    /// Never fails: unreadable images and internal faults, panics included,
    /// degrade to [`ExtractionResult::empty`], which callers treat as
    /// "enter manually".
    pub async fn extract(&self, data: &[u8]) -> ExtractionResult {
        match AssertUnwindSafe(self.try_extract(data)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(error = %e, "receipt extraction failed, returning empty result");
                ExtractionResult::empty()
            }
            Err(_) => {
                warn!("receipt extraction panicked, returning empty result");
                ExtractionResult::empty()
            }
        }
    }

    /// Like [`extract`](Self::extract), but reports an unreadable image (or a
    /// crashed preprocessing task) as an error instead of an empty result.
    /// "No amount found" is still an `Ok` with `Confidence::None`.
    pub async fn try_extract(&self, data: &[u8]) -> Result<ExtractionResult, PipelineError> {
        let text = self.recognize(data).await?;
        panic::catch_unwind(AssertUnwindSafe(|| self.extract_text(&text)))
            .map_err(|_| PipelineError::Internal("receipt heuristics panicked".into()))
    }

    /// Run the text stages only, over already-recognized text.
    pub fn extract_text(&self, text: &str) -> ExtractionResult {
        let scan = self.tokens.extract(text);
        let (amount, confidence) = self.amounts.resolve(&scan.candidates);
        let description = self.descriptions.resolve(&scan.lines);

        info!(
            candidates = scan.candidates.len(),
            lines = scan.lines.len(),
            %amount,
            %confidence,
            "receipt extracted"
        );

        ExtractionResult::new(description, amount, confidence)
    }

    /// Preprocess and recognize, returning the pooled text of all variants.
    pub async fn recognize(&self, data: &[u8]) -> Result<String, PipelineError> {
        let bytes = data.to_vec();
        let max_variants = self.config.max_variants;
        let variants = tokio::task::spawn_blocking(move || preprocess::prepare(&bytes, max_variants))
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))??;

        debug!(variants = variants.len(), "image preprocessed");
        Ok(self.recognize_variants(variants).await)
    }

    /// Every variant runs on its own blocking task under a shared deadline.
    /// A failed, panicked or timed-out variant contributes empty text and never
    /// cancels its siblings. Output keeps variant order.
    async fn recognize_variants(&self, variants: Vec<PreparedImage>) -> String {
        let timeout = self.config.recognition_timeout();
        let deadline = deadline_after(timeout);

        let tasks: Vec<_> = variants
            .into_iter()
            .map(|image| {
                let recognizer = Arc::clone(&self.recognizer);
                let language = self.config.language_hint.clone();
                let variant = image.variant;
                let handle =
                    tokio::task::spawn_blocking(move || recognizer.recognize(&image, &language));
                (variant, handle)
            })
            .collect();

        let mut texts = Vec::with_capacity(tasks.len());
        for (variant, handle) in tasks {
            let text = match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(Ok(text))) => text,
                Ok(Ok(Err(e))) => {
                    warn!(%variant, error = %e, "recognition failed");
                    String::new()
                }
                Ok(Err(e)) => {
                    warn!(%variant, error = %e, "recognizer task crashed");
                    String::new()
                }
                Err(_) => {
                    // Dropping the handle detaches the blocking task; its late
                    // result is discarded.
                    let e = OcrError::Timeout(timeout.as_secs());
                    warn!(%variant, error = %e, "recognition abandoned");
                    String::new()
                }
            };
            debug!(%variant, chars = text.chars().count(), "variant recognized");
            trace!(%variant, %text, "recognized text");
            texts.push(text);
        }

        texts.join("\n")
    }
}

/// `now + timeout`, saturating at the latest representable instant.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| {
            now.checked_add(Duration::from_secs(MAX_RECOGNITION_TIMEOUT_SECS))
        })
        .unwrap_or(now)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
