pub mod config;
pub mod money;
pub mod result;

pub use config::{
    ConfigError, ExtractionConfig, MagnitudeWindow, DEFAULT_KEYWORDS, MAX_RECOGNITION_TIMEOUT_SECS,
};
pub use money::Money;
pub use result::{Confidence, ExtractionResult};
