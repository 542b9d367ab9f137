use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use cupom_core::{ExtractionConfig, ExtractionResult};
use cupom_ocr::{ExtractionPipeline, MockRecognizer, OcrBackend};

/// One line of `extract` output.
#[derive(Debug, Serialize)]
pub struct FileReport<'a> {
    pub file: String,
    #[serde(flatten)]
    pub result: &'a ExtractionResult,
}

pub fn load_config(path: Option<&Path>) -> Result<ExtractionConfig> {
    match path {
        Some(path) => ExtractionConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ExtractionConfig::default()),
    }
}

#[cfg(feature = "tesseract")]
pub fn recognizer(tessdata: Option<PathBuf>) -> cupom_ocr::TesseractRecognizer {
    cupom_ocr::TesseractRecognizer::new(tessdata.map(|p| p.display().to_string()))
}

#[cfg(not(feature = "tesseract"))]
pub fn recognizer(tessdata: Option<PathBuf>) -> cupom_ocr::UnavailableRecognizer {
    if tessdata.is_some() {
        tracing::warn!("--tessdata ignored: built without the `tesseract` feature");
    }
    tracing::warn!("No OCR backend compiled in; images will yield empty text");
    cupom_ocr::UnavailableRecognizer
}

pub fn format_result(file: Option<&Path>, result: &ExtractionResult, json: bool) -> Result<String> {
    if json {
        let report = FileReport {
            file: file.map(|f| f.display().to_string()).unwrap_or_default(),
            result,
        };
        return Ok(serde_json::to_string(&report)?);
    }

    let line = format!(
        "{}\t{}\t{}",
        result.description,
        result.amount.as_decimal(),
        result.confidence
    );
    Ok(match file {
        Some(file) => format!("{}\t{line}", file.display()),
        None => line,
    })
}

/// Process every image; unreadable files are reported and skipped.
/// Fails at the end if any file could not be processed.
pub async fn cmd_extract<R: OcrBackend + 'static>(
    pipeline: &ExtractionPipeline<R>,
    images: &[PathBuf],
    json: bool,
) -> Result<()> {
    let mut failed = 0usize;

    for path in images {
        tracing::info!("Processing receipt: {}", path.display());
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Could not read {}: {e}", path.display());
                failed += 1;
                continue;
            }
        };

        match pipeline.try_extract(&bytes).await {
            Ok(result) => {
                if !result.has_amount() {
                    tracing::warn!("No amount found in {}; enter it manually", path.display());
                }
                println!("{}", format_result(Some(path), &result, json)?);
            }
            Err(e) => {
                tracing::warn!("Could not process {}: {e}", path.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} images could not be processed", images.len());
    }
    Ok(())
}

pub fn parse_text(config: ExtractionConfig, text: &str) -> ExtractionResult {
    ExtractionPipeline::new(MockRecognizer::new(""), config).extract_text(text)
}

pub fn cmd_parse_text(config: ExtractionConfig, file: Option<&Path>, json: bool) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let result = parse_text(config, &text);
    println!("{}", format_result(file, &result, json)?);
    Ok(())
}

pub fn cmd_config(config: &ExtractionConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
