use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_KEYWORDS: &[&str] = &["total", "valor", "pagar", "subtotal", "recebido", "r$"];
pub const DEFAULT_LANGUAGE: &str = "por";
pub const MAX_VARIANTS: usize = 3;
pub const DEFAULT_MAX_DESCRIPTION_LENGTH: usize = 25;
pub const DEFAULT_RECOGNITION_TIMEOUT_SECS: u64 = 30;
/// Upper bound for `recognition_timeout_secs`; one hour per image.
pub const MAX_RECOGNITION_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Range of values considered a realistic transaction amount.
/// The lower bound is exclusive, the upper bound inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MagnitudeWindow {
    pub min: Decimal,
    pub max: Decimal,
}

impl MagnitudeWindow {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: Decimal) -> bool {
        value > self.min && value <= self.max
    }
}

impl Default for MagnitudeWindow {
    fn default() -> Self {
        Self { min: Decimal::new(50, 2), max: Decimal::new(5_000_000, 2) }
    }
}

/// Tunable parameters of the extraction engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Tesseract language code passed to the recognizer.
    pub language_hint: String,
    /// Case-insensitive substrings marking a value-bearing line.
    pub keywords: Vec<String>,
    /// Description suggestions are cut to this many characters.
    pub max_description_length: usize,
    /// How many preprocessed variants are recognized (1..=3).
    pub max_variants: usize,
    pub recognition_timeout_secs: u64,
    pub magnitude_window: MagnitudeWindow,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            language_hint: DEFAULT_LANGUAGE.to_string(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            max_description_length: DEFAULT_MAX_DESCRIPTION_LENGTH,
            max_variants: MAX_VARIANTS,
            recognition_timeout_secs: DEFAULT_RECOGNITION_TIMEOUT_SECS,
            magnitude_window: MagnitudeWindow::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_secs(self.recognition_timeout_secs)
    }

    /// Coerces numeric fields into their valid ranges. Zero falls back to the
    /// default, oversized values are capped. Used for configs that never went
    /// through [`ExtractionConfig::validate`], e.g. struct literals.
    pub fn sanitized(mut self) -> Self {
        if self.max_description_length == 0 {
            self.max_description_length = DEFAULT_MAX_DESCRIPTION_LENGTH;
        }
        self.max_variants = self.max_variants.clamp(1, MAX_VARIANTS);
        self.recognition_timeout_secs = match self.recognition_timeout_secs {
            0 => DEFAULT_RECOGNITION_TIMEOUT_SECS,
            secs => secs.min(MAX_RECOGNITION_TIMEOUT_SECS),
        };
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.magnitude_window;
        if w.min.is_sign_negative() {
            return Err(ConfigError::Invalid("magnitude_window.min must not be negative".into()));
        }
        if w.min >= w.max {
            return Err(ConfigError::Invalid(format!(
                "magnitude_window.min ({}) must be below max ({})",
                w.min, w.max
            )));
        }
        if self.max_description_length == 0 {
            return Err(ConfigError::Invalid("max_description_length must be positive".into()));
        }
        if !(1..=MAX_VARIANTS).contains(&self.max_variants) {
            return Err(ConfigError::Invalid(format!(
                "max_variants must be between 1 and {MAX_VARIANTS}, got {}",
                self.max_variants
            )));
        }
        if self.recognition_timeout_secs == 0 {
            return Err(ConfigError::Invalid("recognition_timeout_secs must be positive".into()));
        }
        if self.recognition_timeout_secs > MAX_RECOGNITION_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "recognition_timeout_secs must be at most {MAX_RECOGNITION_TIMEOUT_SECS}, got {}",
                self.recognition_timeout_secs
            )));
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid("keywords must not contain empty entries".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::str::FromStr;

    #[test]
    fn defaults_are_valid() {
        let c = ExtractionConfig::default();
        c.validate().unwrap();
        assert_eq!(c.language_hint, "por");
        assert_eq!(c.keywords.len(), 6);
        assert_eq!(c.magnitude_window.min, Decimal::from_str("0.50").unwrap());
        assert_eq!(c.magnitude_window.max, Decimal::from_str("50000.00").unwrap());
    }

    #[test]
    fn window_bounds() {
        let w = MagnitudeWindow::default();
        assert!(!w.contains(Decimal::from_str("0.50").unwrap()));
        assert!(w.contains(Decimal::from_str("0.51").unwrap()));
        assert!(w.contains(Decimal::from_str("50000.00").unwrap()));
        assert!(!w.contains(Decimal::from_str("50000.01").unwrap()));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ExtractionConfig::from_toml_str(
            r#"
            language_hint = "eng"
            keywords = ["total", "amount due"]

            [magnitude_window]
            min = "1.00"
            max = "999.99"
            "#,
        )
        .unwrap();
        assert_eq!(c.language_hint, "eng");
        assert_eq!(c.keywords, vec!["total", "amount due"]);
        assert_eq!(c.max_description_length, 25);
        assert_eq!(c.magnitude_window.max, Decimal::from_str("999.99").unwrap());
    }

    #[test]
    fn rejects_inverted_window() {
        let err = ExtractionConfig::from_toml_str(
            r#"
            [magnitude_window]
            min = "100.00"
            max = "10.00"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_out_of_range_variants() {
        let err = ExtractionConfig::from_toml_str("max_variants = 4").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = ExtractionConfig::from_toml_str("max_variants = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unbounded_timeout() {
        let err = ExtractionConfig::from_toml_str("recognition_timeout_secs = 9223372036854775807")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = ExtractionConfig::from_toml_str("recognition_timeout_secs = 3601").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let c = ExtractionConfig::from_toml_str("recognition_timeout_secs = 3600").unwrap();
        assert_eq!(c.recognition_timeout(), Duration::from_secs(3600));
    }

    #[test]
    fn sanitized_coerces_out_of_range_fields() {
        let c = ExtractionConfig {
            max_description_length: 0,
            max_variants: 9,
            recognition_timeout_secs: u64::MAX,
            ..ExtractionConfig::default()
        }
        .sanitized();
        c.validate().unwrap();
        assert_eq!(c.max_description_length, 25);
        assert_eq!(c.max_variants, 3);
        assert_eq!(c.recognition_timeout_secs, MAX_RECOGNITION_TIMEOUT_SECS);

        let c = ExtractionConfig {
            recognition_timeout_secs: 0,
            max_variants: 0,
            ..ExtractionConfig::default()
        }
        .sanitized();
        assert_eq!(c.recognition_timeout_secs, 30);
        assert_eq!(c.max_variants, 1);
    }

    #[test]
    fn sanitized_keeps_valid_config() {
        let c = ExtractionConfig::default();
        assert_eq!(c.clone().sanitized(), c);
    }

    #[test]
    fn rejects_empty_keyword() {
        let err = ExtractionConfig::from_toml_str(r#"keywords = ["total", " "]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = ExtractionConfig::from_toml_str("max_variants = \"three\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_roundtrip() {
        let c = ExtractionConfig::default();
        let s = c.to_toml_string().unwrap();
        assert_eq!(ExtractionConfig::from_toml_str(&s).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "max_description_length = 30").unwrap();
        let c = ExtractionConfig::load(f.path()).unwrap();
        assert_eq!(c.max_description_length, 30);
        assert_eq!(c.recognition_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = ExtractionConfig::load(Path::new("/nonexistent/cupom.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
