pub mod amount;
pub mod description;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod tokens;

pub use amount::AmountResolver;
pub use description::DescriptionResolver;
pub use pipeline::{ExtractionPipeline, PipelineError};
pub use preprocess::{prepare, prepare_image, PreparedImage, PreprocessError, Variant};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, UnavailableRecognizer};
pub use tokens::{normalize_token, NumericCandidate, TokenExtractor, TokenScan};

#[cfg(feature = "tesseract")]
pub use recognizer::tesseract_backend::TesseractRecognizer;
