use thiserror::Error;

use crate::preprocess::PreparedImage;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR timed out after {0} s")]
    Timeout(u64),
    #[error("Tesseract not available: build with the `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over an OCR backend.
/// Implementations receive one preprocessed variant plus a language hint
/// (Tesseract code such as `por` or `eng`) and return the recognized text.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image: &PreparedImage, language: &str) -> Result<String, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string — useful for unit testing the extraction pipeline
/// without requiring Tesseract to be installed.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image: &PreparedImage, _language: &str) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

/// Stand-in for builds without an OCR engine: every call fails with
/// [`OcrError::NotAvailable`], so images yield empty text.
pub struct UnavailableRecognizer;

impl OcrBackend for UnavailableRecognizer {
    fn recognize(&self, _image: &PreparedImage, _language: &str) -> Result<String, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError};
    use crate::preprocess::PreparedImage;
    use leptess::LepTess;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>) -> Self {
            Self { data_path }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image: &PreparedImage, language: &str) -> Result<String, OcrError> {
            let png = image.to_png().map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            // LepTess holds raw Tesseract state; one instance per call keeps
            // concurrent variants independent.
            let mut lt = LepTess::new(self.data_path.as_deref(), language)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(&png)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}
